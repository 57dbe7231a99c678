use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Closed set of spreadsheet-facing literals.
///
/// Every enum that appears as a column value implements this so the
/// validator, the exporter, and the HTTP layer share one list of labels.
pub trait LabeledEnum: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    fn from_label(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.label().eq_ignore_ascii_case(trimmed))
    }

    fn options() -> String {
        Self::ALL
            .iter()
            .map(|value| value.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionStatus {
    #[default]
    NotStarted,
    InProgress,
    Complete,
}

impl LabeledEnum for ConstructionStatus {
    const ALL: &'static [Self] = &[Self::NotStarted, Self::InProgress, Self::Complete];

    fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Complete => "Complete",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesStatus {
    #[default]
    NotReleased,
    ForSale,
    UnderOffer,
    Contracted,
    Complete,
}

impl LabeledEnum for SalesStatus {
    const ALL: &'static [Self] = &[
        Self::NotReleased,
        Self::ForSale,
        Self::UnderOffer,
        Self::Contracted,
        Self::Complete,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::NotReleased => "Not Released",
            Self::ForSale => "For Sale",
            Self::UnderOffer => "Under Offer",
            Self::Contracted => "Contracted",
            Self::Complete => "Complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaserType {
    Private,
    Council,
    Ahb,
    Other,
}

impl LabeledEnum for PurchaserType {
    const ALL: &'static [Self] = &[Self::Private, Self::Council, Self::Ahb, Self::Other];

    fn label(self) -> &'static str {
        match self {
            Self::Private => "Private",
            Self::Council => "Council",
            Self::Ahb => "AHB",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

impl LabeledEnum for DevelopmentStatus {
    const ALL: &'static [Self] = &[Self::Active, Self::Completed, Self::Archived];

    fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Archived => "Archived",
        }
    }
}

/// Identifier wrapper for developments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DevelopmentId(pub String);

impl DevelopmentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DevelopmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub list_price: Option<f64>,
    pub sold_price: Option<f64>,
    pub price_ex_vat: Option<f64>,
    pub price_inc_vat: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchaser {
    #[serde(rename = "type")]
    pub purchaser_type: Option<PurchaserType>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDates {
    pub sale_agreed: Option<NaiveDate>,
    pub deposit_paid: Option<NaiveDate>,
    pub planned_close: Option<NaiveDate>,
    pub snag: Option<NaiveDate>,
}

/// A documentation checkpoint: a flag and the date it was reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub complete: bool,
    pub date: Option<NaiveDate>,
}

impl Milestone {
    /// The recorded date is authoritative; the flag alone can lag behind it.
    pub fn is_complete(&self) -> bool {
        self.complete || self.date.is_some()
    }

    pub fn is_inconsistent(&self) -> bool {
        !self.complete && self.date.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MilestoneKind {
    BcmsSubmitted,
    LandRegistryApproved,
    HomebondReceived,
    SanApproved,
    ContractIssued,
    ContractSigned,
    SaleClosed,
}

impl MilestoneKind {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::BcmsSubmitted,
            Self::LandRegistryApproved,
            Self::HomebondReceived,
            Self::SanApproved,
            Self::ContractIssued,
            Self::ContractSigned,
            Self::SaleClosed,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::BcmsSubmitted => "BCMS Submitted",
            Self::LandRegistryApproved => "Land Registry Approved",
            Self::HomebondReceived => "Homebond Received",
            Self::SanApproved => "SAN Approved",
            Self::ContractIssued => "Contract Issued",
            Self::ContractSigned => "Contract Signed",
            Self::SaleClosed => "Sale Closed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Documentation {
    pub bcms_submitted: Milestone,
    pub land_registry_approved: Milestone,
    pub homebond_received: Milestone,
    pub san_approved: Milestone,
    pub contract_issued: Milestone,
    pub contract_signed: Milestone,
    pub sale_closed: Milestone,
}

impl Documentation {
    pub fn milestone(&self, kind: MilestoneKind) -> &Milestone {
        match kind {
            MilestoneKind::BcmsSubmitted => &self.bcms_submitted,
            MilestoneKind::LandRegistryApproved => &self.land_registry_approved,
            MilestoneKind::HomebondReceived => &self.homebond_received,
            MilestoneKind::SanApproved => &self.san_approved,
            MilestoneKind::ContractIssued => &self.contract_issued,
            MilestoneKind::ContractSigned => &self.contract_signed,
            MilestoneKind::SaleClosed => &self.sale_closed,
        }
    }

    pub fn milestone_mut(&mut self, kind: MilestoneKind) -> &mut Milestone {
        match kind {
            MilestoneKind::BcmsSubmitted => &mut self.bcms_submitted,
            MilestoneKind::LandRegistryApproved => &mut self.land_registry_approved,
            MilestoneKind::HomebondReceived => &mut self.homebond_received,
            MilestoneKind::SanApproved => &mut self.san_approved,
            MilestoneKind::ContractIssued => &mut self.contract_issued,
            MilestoneKind::ContractSigned => &mut self.contract_signed,
            MilestoneKind::SaleClosed => &mut self.sale_closed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incentive {
    pub scheme: Option<String>,
    pub amount: Option<f64>,
}

/// One sellable property within a development.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub unit_number: String,
    #[serde(rename = "type")]
    pub unit_type: String,
    pub address: String,
    pub bedrooms: Option<u32>,
    pub size_sq_m: Option<f64>,
    pub construction_status: ConstructionStatus,
    pub sales_status: SalesStatus,
    #[serde(default)]
    pub pricing: Pricing,
    #[serde(default)]
    pub purchaser: Purchaser,
    #[serde(default)]
    pub part_v: bool,
    #[serde(default)]
    pub key_dates: KeyDates,
    #[serde(default)]
    pub documentation: Documentation,
    #[serde(default)]
    pub incentive: Incentive,
}

impl Unit {
    pub fn new(unit_number: impl Into<String>, unit_type: impl Into<String>) -> Self {
        Self {
            unit_number: unit_number.into(),
            unit_type: unit_type.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Development {
    pub id: DevelopmentId,
    pub name: String,
    pub project_number: String,
    #[serde(default)]
    pub status: DevelopmentStatus,
    #[serde(default)]
    pub units: Vec<Unit>,
}

impl Development {
    pub fn unit(&self, unit_number: &str) -> Option<&Unit> {
        let wanted = unit_number.trim();
        self.units
            .iter()
            .find(|unit| unit.unit_number.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn unit_mut(&mut self, unit_number: &str) -> Option<&mut Unit> {
        let wanted = unit_number.trim();
        self.units
            .iter_mut()
            .find(|unit| unit.unit_number.trim().eq_ignore_ascii_case(wanted))
    }

    /// Name comparison used when resolving spreadsheet rows.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}

/// Persisted snapshot that supersedes the base data for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOverride {
    pub development_id: DevelopmentId,
    pub unit_number: String,
    pub unit: Unit,
}

/// The person responsible for a change, as supplied by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
}

impl Actor {
    pub fn new(
        user_id: impl Into<String>,
        user_email: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_email: user_email.into(),
            user_name: user_name.into(),
        }
    }
}
