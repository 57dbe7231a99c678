use std::fs::File;
use std::path::{Path, PathBuf};

use clap::Args;
use devtrack::config::AppConfig;
use devtrack::error::AppError;
use devtrack::import::{
    export_csv, export_xlsx, import_units_from_csv, import_units_from_excel, ImportResult,
};
use devtrack::portfolio::{Development, DevelopmentId, PortfolioRepository};

use crate::infra::load_portfolio;

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Destination file; a `.csv` extension writes CSV, anything else writes .xlsx
    #[arg(long)]
    pub(crate) out: PathBuf,
    /// Export a single development by id
    #[arg(long)]
    pub(crate) development: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct PreviewArgs {
    /// Spreadsheet to reconcile (.xlsx or .csv)
    #[arg(long)]
    pub(crate) file: PathBuf,
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let portfolio = load_portfolio(&config.portfolio)?;

    let developments = match args.development {
        Some(id) => {
            let id = DevelopmentId(id);
            let development = portfolio
                .development(&id)?
                .ok_or_else(|| AppError::NotFound(format!("development {id}")))?;
            vec![development]
        }
        None => portfolio.developments()?,
    };

    if is_csv(&args.out) {
        export_csv(&developments, File::create(&args.out)?)?;
    } else {
        std::fs::write(&args.out, export_xlsx(&developments)?)?;
    }

    println!(
        "Exported {} units from {} developments to {}",
        unit_count(&developments),
        developments.len(),
        args.out.display()
    );
    Ok(())
}

pub(crate) fn run_preview(args: PreviewArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let portfolio = load_portfolio(&config.portfolio)?;
    let developments = portfolio.developments()?;
    let options = config.import.options();

    let result = if is_csv(&args.file) {
        import_units_from_csv(File::open(&args.file)?, &developments, &options)
    } else {
        let bytes = std::fs::read(&args.file)?;
        import_units_from_excel(&bytes, &developments, &options)
    };

    println!("{}", render_preview(&result));
    Ok(())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"))
}

fn unit_count(developments: &[Development]) -> usize {
    developments
        .iter()
        .map(|development| development.units.len())
        .sum()
}

pub(crate) fn render_preview(result: &ImportResult) -> String {
    let summary = result.summary;
    let mut lines = vec![format!(
        "Import preview: {} rows | {} changed | {} unchanged | {} errors | {} warnings",
        summary.total,
        summary.changed,
        summary.unchanged,
        summary.errors,
        result.warning_count()
    )];

    for row in &result.valid {
        lines.push(format!(
            "- Row {}: {} unit {}",
            row.row, row.development_name, row.unit_number
        ));
        for change in &row.changes {
            lines.push(format!(
                "    {}: {} -> {}",
                change.field,
                display_or_blank(&change.old_value.to_string()),
                display_or_blank(&change.new_value.to_string())
            ));
        }
        for warning in &row.warnings {
            lines.push(format!("    warning: {warning}"));
        }
    }

    for warning in &result.warnings {
        lines.push(format!("- Row {}: warning: {}", warning.row, warning.message));
    }

    if !result.errors.is_empty() {
        lines.push("Errors:".to_string());
        for error in &result.errors {
            if error.row == 0 {
                lines.push(format!("- {}", error.message));
            } else {
                lines.push(format!("- Row {}: {}", error.row, error.message));
            }
        }
    }

    lines.join("\n")
}

fn display_or_blank(value: &str) -> &str {
    if value.is_empty() {
        "(blank)"
    } else {
        value
    }
}
