//! Portfolio engine for property developments.
//!
//! Operators export a development's units to a spreadsheet, edit it offline and
//! upload it again. [`import`] reconciles the upload against stored units,
//! [`apply`] commits the rows the operator keeps, and [`audit`] records who
//! changed what.

pub mod apply;
pub mod audit;
pub mod config;
pub mod error;
pub mod import;
pub mod portfolio;
pub mod telemetry;

pub use error::AppError;
