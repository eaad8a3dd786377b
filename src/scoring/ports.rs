use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::scoring::error::ScoringError;
use crate::scoring::types::{HistoricalCaseRecord, ToolInvocationRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleAction {
    Continue,
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    pub target: String,
}

/// Everything the reasoning backend sees for one assessment round. The
/// invocation history carries prior evidence so each round builds on the
/// last instead of restarting.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub lead_text: String,
    pub historical_context: Vec<HistoricalCaseRecord>,
    pub invocation_history: Vec<ToolInvocationRecord>,
}

/// One assessment round's reply. Structured fields take precedence; when a
/// backend answers in prose only, the orchestrator falls back to parsing the
/// narrative.
#[derive(Debug, Clone, Default)]
pub struct OracleResponse {
    pub action: Option<OracleAction>,
    pub confidence: Option<u8>,
    pub tool_request: Option<ToolRequest>,
    pub raw_score: Option<u8>,
    pub jurisdiction: Option<String>,
    pub narrative: String,
}

/// Seam to the reasoning backend that drives assessment rounds.
#[async_trait]
pub trait ReasoningOraclePort: Send + Sync {
    async fn assess(&self, request: OracleRequest) -> Result<OracleResponse, ScoringError>;
}

/// Seam to the jurisdiction statistics. Lookups never fail; unknown
/// jurisdictions resolve to a neutral 1.0.
pub trait ModifierLookupPort: Send + Sync {
    fn modifier_for(&self, jurisdiction: &str) -> f64;
}
