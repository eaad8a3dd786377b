use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Batch-computed statistics for one jurisdiction. `modifier` is the bounded
/// multiplier applied to raw lead scores at finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionStatistics {
    pub jurisdiction: String,
    pub case_count: u64,
    pub raw_score: f64,
    pub adjusted_score: f64,
    pub modifier: f64,
}

/// The whole persisted table, rewritten wholesale on each batch recompute.
pub type JurisdictionTable = BTreeMap<String, JurisdictionStatistics>;
