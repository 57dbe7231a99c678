//! Developments, units, and the repository seam that owns them.

pub mod domain;
pub mod repository;

pub use domain::{
    Actor, ConstructionStatus, Development, DevelopmentId, DevelopmentStatus, Documentation,
    Incentive, KeyDates, LabeledEnum, Milestone, MilestoneKind, Pricing, Purchaser,
    PurchaserType, SalesStatus, Unit, UnitOverride,
};
pub use repository::{
    MemoryOverrideStore, OverlayPortfolio, OverrideStore, PortfolioRepository, RepositoryError,
};
