pub mod error;
pub mod manager;
pub mod persistence;
pub mod types;

pub use error::{JurisdictionError, JurisdictionErrorKind};
pub use manager::{JurisdictionScoreManager, parse_settlement, shrink};
pub use persistence::TablePersistence;
pub use types::{JurisdictionStatistics, JurisdictionTable};
