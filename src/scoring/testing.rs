//! Scripted doubles for the orchestrator's seams, shared by unit and
//! integration tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::scoring::error::{ScoringError, service_unavailable};
use crate::scoring::ports::{
    ModifierLookupPort, OracleAction, OracleRequest, OracleResponse, ReasoningOraclePort,
    ToolRequest,
};

/// Replays a fixed sequence of assessment replies in order. Runs dry with a
/// `ServiceUnavailable` error so a test that under-scripts fails loudly.
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Result<OracleResponse, ScoringError>>>,
}

impl ScriptedOracle {
    pub fn new(script: Vec<Result<OracleResponse, ScoringError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ReasoningOraclePort for ScriptedOracle {
    async fn assess(&self, _request: OracleRequest) -> Result<OracleResponse, ScoringError> {
        let mut guard = self
            .script
            .lock()
            .map_err(|_| service_unavailable("scripted oracle lock poisoned"))?;
        guard
            .pop_front()
            .unwrap_or_else(|| Err(service_unavailable("scripted oracle ran out of replies")))
    }
}

/// A continuation round that requests one tool call.
pub fn continue_with_tool(confidence: u8, tool: &str, target: &str) -> OracleResponse {
    OracleResponse {
        action: Some(OracleAction::Continue),
        confidence: Some(confidence),
        tool_request: Some(ToolRequest {
            name: tool.to_string(),
            target: target.to_string(),
        }),
        ..OracleResponse::default()
    }
}

/// A finalize round carrying the raw score and jurisdiction.
pub fn finalize_with(confidence: u8, raw_score: u8, jurisdiction: Option<&str>) -> OracleResponse {
    OracleResponse {
        action: Some(OracleAction::Finalize),
        confidence: Some(confidence),
        raw_score: Some(raw_score),
        jurisdiction: jurisdiction.map(str::to_string),
        ..OracleResponse::default()
    }
}

/// A prose-only round with no structured fields.
pub fn narrative_only(narrative: &str) -> OracleResponse {
    OracleResponse {
        narrative: narrative.to_string(),
        ..OracleResponse::default()
    }
}

/// Returns the same modifier for every jurisdiction.
pub struct FixedModifier(pub f64);

impl ModifierLookupPort for FixedModifier {
    fn modifier_for(&self, _jurisdiction: &str) -> f64 {
        self.0
    }
}
