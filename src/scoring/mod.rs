pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod parse;
pub mod ports;
pub mod testing;
pub mod types;

pub use error::{ScoringError, ScoringErrorKind};
pub use gate::{GateDecision, GateLimits};
pub use orchestrator::ScoringOrchestrator;
pub use ports::{
    ModifierLookupPort, OracleAction, OracleRequest, OracleResponse, ReasoningOraclePort,
    ToolRequest,
};
pub use types::{
    FinalScoreResult, HistoricalCaseRecord, InvocationOutcome, ScoringSession, SessionState,
    ToolInvocationRecord, summarize_tool_usage,
};
