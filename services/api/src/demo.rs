use chrono::NaiveDate;
use devtrack::portfolio::{
    ConstructionStatus, Development, DevelopmentId, DevelopmentStatus, Milestone, PurchaserType,
    SalesStatus, Unit,
};

/// Built-in portfolio used when no seed file is configured.
pub(crate) fn demo_portfolio() -> Vec<Development> {
    vec![harbour_view(), millbrook()]
}

fn date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn unit(number: &str, unit_type: &str, street: &str, bedrooms: u32, size: f64) -> Unit {
    let mut unit = Unit::new(number, unit_type);
    unit.address = format!("{number} {street}");
    unit.bedrooms = Some(bedrooms);
    unit.size_sq_m = Some(size);
    unit
}

fn harbour_view() -> Development {
    let mut sold = unit("1", "Semi-Detached", "Quay Road", 3, 112.5);
    sold.construction_status = ConstructionStatus::Complete;
    sold.sales_status = SalesStatus::Complete;
    sold.pricing.list_price = Some(395_000.0);
    sold.pricing.sold_price = Some(390_000.0);
    sold.pricing.price_ex_vat = Some(343_612.0);
    sold.pricing.price_inc_vat = Some(390_000.0);
    sold.purchaser.purchaser_type = Some(PurchaserType::Private);
    sold.purchaser.name = Some("A. Byrne".to_string());
    sold.key_dates.sale_agreed = date(2024, 11, 4);
    sold.key_dates.deposit_paid = date(2024, 11, 18);
    sold.documentation.bcms_submitted = Milestone {
        complete: true,
        date: date(2024, 9, 2),
    };
    sold.documentation.contract_signed = Milestone {
        complete: true,
        date: date(2025, 1, 20),
    };
    sold.documentation.sale_closed = Milestone {
        complete: true,
        date: date(2025, 3, 3),
    };

    let mut contracted = unit("2", "Semi-Detached", "Quay Road", 3, 112.5);
    contracted.construction_status = ConstructionStatus::InProgress;
    contracted.sales_status = SalesStatus::Contracted;
    contracted.pricing.list_price = Some(395_000.0);
    contracted.pricing.price_ex_vat = Some(347_577.0);
    contracted.purchaser.purchaser_type = Some(PurchaserType::Ahb);
    contracted.part_v = true;
    contracted.key_dates.planned_close = date(2025, 9, 30);
    contracted.incentive.scheme = Some("Help to Buy".to_string());
    contracted.incentive.amount = Some(30_000.0);

    let mut for_sale = unit("3", "Detached", "Quay Road", 4, 148.0);
    for_sale.construction_status = ConstructionStatus::InProgress;
    for_sale.sales_status = SalesStatus::ForSale;
    for_sale.pricing.list_price = Some(525_000.0);

    let unreleased = unit("4", "Apartment", "Quay Road", 2, 78.0);

    Development {
        id: DevelopmentId::new("dev-harbour-view"),
        name: "Harbour View".to_string(),
        project_number: "HV-2023-01".to_string(),
        status: DevelopmentStatus::Active,
        units: vec![sold, contracted, for_sale, unreleased],
    }
}

fn millbrook() -> Development {
    let mut council = unit("A1", "Terrace", "Millbrook Lane", 2, 84.0);
    council.construction_status = ConstructionStatus::Complete;
    council.sales_status = SalesStatus::UnderOffer;
    council.purchaser.purchaser_type = Some(PurchaserType::Council);
    council.pricing.price_ex_vat = Some(285_000.0);
    council.part_v = true;

    let mut open_market = unit("A2", "Terrace", "Millbrook Lane", 3, 101.0);
    open_market.construction_status = ConstructionStatus::Complete;
    open_market.sales_status = SalesStatus::ForSale;
    open_market.pricing.list_price = Some(349_950.0);

    let site = unit("A3", "End Terrace", "Millbrook Lane", 3, 104.0);

    Development {
        id: DevelopmentId::new("dev-millbrook"),
        name: "Millbrook".to_string(),
        project_number: "MB-2024-02".to_string(),
        status: DevelopmentStatus::Active,
        units: vec![council, open_market, site],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_units_are_unique_per_development() {
        for development in demo_portfolio() {
            let mut numbers: Vec<_> = development
                .units
                .iter()
                .map(|unit| unit.unit_number.as_str())
                .collect();
            let total = numbers.len();
            numbers.sort_unstable();
            numbers.dedup();
            assert_eq!(numbers.len(), total, "{} has duplicate units", development.name);
        }
    }
}
