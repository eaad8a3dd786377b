use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A previously resolved case supplied by the retrieval collaborator as
/// comparison evidence. Immutable for the lifetime of the session that owns
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalCaseRecord {
    pub case_id: String,
    #[serde(default)]
    pub jurisdiction: String,
    #[serde(default)]
    pub case_type: String,
    #[serde(default)]
    pub injuries_described: String,
    #[serde(default)]
    pub settlement_value: Option<String>,
    #[serde(default)]
    pub case_outcome: String,
    #[serde(default)]
    pub incident_date: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_phrases: Vec<String>,
}

impl HistoricalCaseRecord {
    /// Presence check by field name, used by the completeness scorer. Empty
    /// strings and empty lists count as missing.
    pub fn field_present(&self, field: &str) -> bool {
        match field {
            "case_id" => !self.case_id.trim().is_empty(),
            "jurisdiction" => !self.jurisdiction.trim().is_empty(),
            "case_type" => !self.case_type.trim().is_empty(),
            "injuries_described" => !self.injuries_described.trim().is_empty(),
            "settlement_value" => self
                .settlement_value
                .as_deref()
                .is_some_and(|value| !value.trim().is_empty()),
            "case_outcome" => !self.case_outcome.trim().is_empty(),
            "incident_date" => self
                .incident_date
                .as_deref()
                .is_some_and(|value| !value.trim().is_empty()),
            "source" => !self.source.trim().is_empty(),
            "summary" => !self.summary.trim().is_empty(),
            "key_phrases" => !self.key_phrases.is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InvocationOutcome {
    /// The tool ran and produced evidence.
    Output { content: String },
    /// The tool ran and failed; counted against the call budget.
    Error { message: String },
    /// The request was rejected before dispatch (unknown tool, duplicate
    /// target, malformed request); not counted against the budget.
    Rejected { reason: String },
}

/// One line of the audit trail. `confidence_after` starts equal to
/// `confidence_before` and is backfilled from the next assessment round once
/// the evidence has been weighed; on the last record of a session the two
/// stay equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    pub tool_name: String,
    pub target: String,
    pub input: String,
    pub outcome: InvocationOutcome,
    pub confidence_before: u8,
    pub confidence_after: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Init,
    Assess,
    ToolCall,
    Finalize,
    Done,
}

/// Mutable state for one scoring run. Created at session start, mutated only
/// by the orchestrator, archived into the `FinalScoreResult` at FINALIZE.
#[derive(Debug, Clone)]
pub struct ScoringSession {
    pub session_id: String,
    pub lead_text: String,
    pub historical_context: Vec<HistoricalCaseRecord>,
    pub calls_made: u32,
    pub confidence_trace: Vec<u8>,
    pub invoked_targets: BTreeSet<String>,
    pub audit_trail: Vec<ToolInvocationRecord>,
    pub state: SessionState,
}

impl ScoringSession {
    pub fn new(lead_text: String, historical_context: Vec<HistoricalCaseRecord>) -> Self {
        Self {
            session_id: Uuid::now_v7().to_string(),
            lead_text,
            historical_context,
            calls_made: 0,
            confidence_trace: Vec::new(),
            invoked_targets: BTreeSet::new(),
            audit_trail: Vec::new(),
            state: SessionState::Init,
        }
    }

    pub fn latest_confidence(&self) -> u8 {
        self.confidence_trace.last().copied().unwrap_or(0)
    }
}

/// The complete outcome of a scoring session. Always emitted, clean or
/// degraded; the system never answers a scoring request with a bare failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalScoreResult {
    pub session_id: String,
    pub raw_score: u8,
    pub jurisdiction: Option<String>,
    pub modifier: f64,
    pub final_score: u8,
    pub confidence: u8,
    pub tool_call_count: u32,
    pub low_confidence_forced: bool,
    pub degraded: bool,
    pub aborted: bool,
    pub tool_usage_summary: String,
    pub audit_trail: Vec<ToolInvocationRecord>,
}

/// Per-tool call counts in a human-readable line, carried on the result so a
/// reviewer can see analysis depth without replaying the audit trail.
pub fn summarize_tool_usage(audit_trail: &[ToolInvocationRecord]) -> String {
    let mut counts: std::collections::BTreeMap<&str, u32> = std::collections::BTreeMap::new();
    for record in audit_trail {
        if matches!(record.outcome, InvocationOutcome::Rejected { .. }) {
            continue;
        }
        *counts.entry(record.tool_name.as_str()).or_insert(0) += 1;
    }

    if counts.is_empty() {
        return "No tool calls were made.".to_string();
    }

    let parts: Vec<String> = counts
        .into_iter()
        .map(|(name, count)| {
            if count == 1 {
                format!("{name} (1 time)")
            } else {
                format!("{name} ({count} times)")
            }
        })
        .collect();
    format!("Tools used: {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::{
        HistoricalCaseRecord, InvocationOutcome, ToolInvocationRecord, summarize_tool_usage,
    };

    fn invocation(tool: &str, outcome: InvocationOutcome) -> ToolInvocationRecord {
        ToolInvocationRecord {
            tool_name: tool.to_string(),
            target: "doc.pdf".to_string(),
            input: "doc.pdf".to_string(),
            outcome,
            confidence_before: 40,
            confidence_after: 55,
        }
    }

    #[test]
    fn field_presence_treats_blank_values_as_missing() {
        let record = HistoricalCaseRecord {
            case_id: "case-1".to_string(),
            jurisdiction: "  ".to_string(),
            case_type: "slip_and_fall".to_string(),
            injuries_described: String::new(),
            settlement_value: Some(String::new()),
            case_outcome: "settled".to_string(),
            incident_date: None,
            source: "a.pdf".to_string(),
            summary: String::new(),
            key_phrases: Vec::new(),
        };

        assert!(record.field_present("case_id"));
        assert!(record.field_present("case_type"));
        assert!(!record.field_present("jurisdiction"));
        assert!(!record.field_present("injuries_described"));
        assert!(!record.field_present("settlement_value"));
        assert!(!record.field_present("incident_date"));
        assert!(!record.field_present("key_phrases"));
        assert!(!record.field_present("no_such_field"));
    }

    #[test]
    fn tool_usage_summary_counts_dispatched_calls_only() {
        let trail = vec![
            invocation(
                "file_summary",
                InvocationOutcome::Output {
                    content: "summary".to_string(),
                },
            ),
            invocation(
                "file_summary",
                InvocationOutcome::Error {
                    message: "backend unreachable".to_string(),
                },
            ),
            invocation(
                "file_summary",
                InvocationOutcome::Rejected {
                    reason: "duplicate target".to_string(),
                },
            ),
        ];
        assert_eq!(
            summarize_tool_usage(&trail),
            "Tools used: file_summary (2 times)"
        );
        assert_eq!(summarize_tool_usage(&[]), "No tool calls were made.");
    }
}
