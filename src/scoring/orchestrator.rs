use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::{Instant, sleep, timeout};

use crate::config::ScoringConfig;
use crate::dispatch::{DispatchError, DispatchErrorKind, ToolDispatcher};
use crate::scoring::error::{ScoringError, invalid_request};
use crate::scoring::gate::{self, GateDecision, GateLimits};
use crate::scoring::parse;
use crate::scoring::ports::{
    ModifierLookupPort, OracleRequest, OracleResponse, ReasoningOraclePort, ToolRequest,
};
use crate::scoring::types::{
    FinalScoreResult, HistoricalCaseRecord, InvocationOutcome, ScoringSession, SessionState,
    ToolInvocationRecord, summarize_tool_usage,
};

/// Drives one lead through the assess / gate / tool-call loop and always
/// lands on a `FinalScoreResult`. Backend failures, rejection storms and
/// budget exhaustion degrade the result instead of failing the request;
/// only an invalid request itself is an error.
pub struct ScoringOrchestrator {
    config: ScoringConfig,
    oracle: Arc<dyn ReasoningOraclePort>,
    dispatcher: Arc<ToolDispatcher>,
    modifiers: Arc<dyn ModifierLookupPort>,
}

impl ScoringOrchestrator {
    pub fn new(
        config: ScoringConfig,
        oracle: Arc<dyn ReasoningOraclePort>,
        dispatcher: Arc<ToolDispatcher>,
        modifiers: Arc<dyn ModifierLookupPort>,
    ) -> Self {
        Self {
            config,
            oracle,
            dispatcher,
            modifiers,
        }
    }

    pub async fn score(
        &self,
        lead_text: &str,
        historical_context: Vec<HistoricalCaseRecord>,
    ) -> Result<FinalScoreResult, ScoringError> {
        self.score_with_abort(lead_text, historical_context, Arc::new(AtomicBool::new(false)))
            .await
    }

    /// Same as `score`, with a cooperative abort flag checked between
    /// iterations. A raised flag finalizes immediately from whatever the
    /// session has gathered so far.
    pub async fn score_with_abort(
        &self,
        lead_text: &str,
        historical_context: Vec<HistoricalCaseRecord>,
        abort: Arc<AtomicBool>,
    ) -> Result<FinalScoreResult, ScoringError> {
        if lead_text.trim().is_empty() {
            return Err(invalid_request("lead text must not be empty"));
        }

        let mut session = ScoringSession::new(lead_text.to_string(), historical_context);
        tracing::info!(session_id = %session.session_id, "scoring session started");

        let limits = GateLimits {
            finalize_threshold: self.config.confidence_finalize_threshold,
            tool_call_limit: self.config.tool_call_limit,
        };
        let started = Instant::now();
        let session_budget = Duration::from_millis(self.config.session_budget_ms);

        let mut last_raw_score: Option<u8> = None;
        let mut last_jurisdiction: Option<String> = None;
        let mut consecutive_rejections: u32 = 0;
        let mut degraded = false;
        let mut aborted = false;
        let mut budget_elapsed = false;

        loop {
            if abort.load(Ordering::SeqCst) {
                aborted = true;
                break;
            }
            if started.elapsed() >= session_budget {
                tracing::warn!(
                    session_id = %session.session_id,
                    "session wall-clock budget exhausted, forcing finalize"
                );
                budget_elapsed = true;
                break;
            }

            session.state = SessionState::Assess;
            let response = match self.assess_with_retry(&session).await {
                Ok(response) => response,
                Err(error) => {
                    tracing::warn!(
                        session_id = %session.session_id,
                        error = %error,
                        "assessment backend unavailable, finalizing degraded"
                    );
                    degraded = true;
                    break;
                }
            };

            if let Some(score) = response
                .raw_score
                .or_else(|| parse::extract_score(&response.narrative))
            {
                last_raw_score = Some(score);
            }
            if let Some(jurisdiction) = response
                .jurisdiction
                .clone()
                .or_else(|| parse::extract_jurisdiction(&response.narrative))
            {
                last_jurisdiction = Some(jurisdiction);
            }

            let confidence = response
                .confidence
                .or_else(|| parse::extract_confidence(&response.narrative));
            if let (Some(confidence), Some(last)) = (confidence, session.audit_trail.last_mut()) {
                last.confidence_after = confidence;
            }
            let Some(confidence) = confidence else {
                self.reject(
                    &mut session,
                    &response.tool_request,
                    "assessment reply carried no confidence figure",
                );
                consecutive_rejections += 1;
                if consecutive_rejections >= self.config.max_rejected_requests {
                    degraded = true;
                    break;
                }
                continue;
            };
            session.confidence_trace.push(confidence);

            if gate::evaluate(confidence, session.calls_made, &limits) == GateDecision::Finalize {
                break;
            }

            session.state = SessionState::ToolCall;
            let Some(request) = response.tool_request else {
                self.reject(
                    &mut session,
                    &None,
                    "continuation requested without naming a tool",
                );
                consecutive_rejections += 1;
                if consecutive_rejections >= self.config.max_rejected_requests {
                    degraded = true;
                    break;
                }
                continue;
            };

            match self.dispatch(&mut session, &request, confidence).await {
                DispatchResult::Executed => {
                    consecutive_rejections = 0;
                }
                DispatchResult::Rejected => {
                    consecutive_rejections += 1;
                    if consecutive_rejections >= self.config.max_rejected_requests {
                        degraded = true;
                        break;
                    }
                }
            }
        }

        session.state = SessionState::Finalize;
        let confidence = session.latest_confidence();
        let low_confidence_forced = (budget_elapsed
            || session.calls_made >= self.config.tool_call_limit)
            && confidence < self.config.confidence_finalize_threshold;

        let raw_score = match last_raw_score {
            Some(score) => score,
            None => {
                degraded = true;
                1
            }
        };
        let modifier = last_jurisdiction
            .as_deref()
            .map(|jurisdiction| self.modifiers.modifier_for(jurisdiction))
            .unwrap_or(1.0);
        let final_score = ((f64::from(raw_score) * modifier).round() as i64).clamp(1, 100) as u8;

        session.state = SessionState::Done;
        tracing::info!(
            session_id = %session.session_id,
            raw_score,
            final_score,
            confidence,
            tool_calls = session.calls_made,
            degraded,
            aborted,
            "scoring session finalized"
        );

        Ok(FinalScoreResult {
            session_id: session.session_id,
            raw_score,
            jurisdiction: last_jurisdiction,
            modifier,
            final_score,
            confidence,
            tool_call_count: session.calls_made,
            low_confidence_forced,
            degraded,
            aborted,
            tool_usage_summary: summarize_tool_usage(&session.audit_trail),
            audit_trail: session.audit_trail,
        })
    }

    async fn assess_with_retry(
        &self,
        session: &ScoringSession,
    ) -> Result<OracleResponse, ScoringError> {
        let call_timeout = Duration::from_millis(self.config.call_timeout_ms);
        let mut last_error = None;

        for attempt in 0..=self.config.retry_limit {
            if attempt > 0 {
                let backoff = retry_backoff_ms(self.config.retry_backoff_ms, attempt);
                sleep(Duration::from_millis(backoff)).await;
            }

            let request = OracleRequest {
                lead_text: session.lead_text.clone(),
                historical_context: session.historical_context.clone(),
                invocation_history: session.audit_trail.clone(),
            };
            match timeout(call_timeout, self.oracle.assess(request)).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(error)) => {
                    tracing::warn!(
                        session_id = %session.session_id,
                        attempt,
                        error = %error,
                        "assessment attempt failed"
                    );
                    last_error = Some(error);
                }
                Err(_) => {
                    tracing::warn!(
                        session_id = %session.session_id,
                        attempt,
                        "assessment attempt timed out"
                    );
                    last_error = Some(crate::scoring::error::service_unavailable(
                        "assessment backend timed out",
                    ));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            crate::scoring::error::service_unavailable("assessment backend unavailable")
        }))
    }

    async fn dispatch(
        &self,
        session: &mut ScoringSession,
        request: &ToolRequest,
        confidence: u8,
    ) -> DispatchResult {
        let call_timeout = Duration::from_millis(self.config.call_timeout_ms);
        let invocation = timeout(
            call_timeout,
            self.dispatcher
                .invoke(&request.name, &request.target, &session.invoked_targets),
        )
        .await;

        let outcome = match invocation {
            Ok(Ok(content)) => InvocationOutcome::Output { content },
            Ok(Err(error)) => match error.kind {
                DispatchErrorKind::UnknownTool | DispatchErrorKind::DuplicateTarget => {
                    return self.reject_dispatch(session, request, confidence, error);
                }
                _ => InvocationOutcome::Error {
                    message: error.message,
                },
            },
            Err(_) => InvocationOutcome::Error {
                message: format!("tool call timed out after {}ms", self.config.call_timeout_ms),
            },
        };

        if matches!(outcome, InvocationOutcome::Error { .. }) {
            tracing::warn!(
                session_id = %session.session_id,
                tool = %request.name,
                target = %request.target,
                "tool call failed"
            );
        }

        session.calls_made += 1;
        session.invoked_targets.insert(request.target.clone());
        session.audit_trail.push(ToolInvocationRecord {
            tool_name: request.name.clone(),
            target: request.target.clone(),
            input: request.target.clone(),
            outcome,
            confidence_before: confidence,
            confidence_after: confidence,
        });
        DispatchResult::Executed
    }

    fn reject_dispatch(
        &self,
        session: &mut ScoringSession,
        request: &ToolRequest,
        confidence: u8,
        error: DispatchError,
    ) -> DispatchResult {
        tracing::warn!(
            session_id = %session.session_id,
            tool = %request.name,
            target = %request.target,
            reason = %error.message,
            "tool request rejected"
        );
        session.audit_trail.push(ToolInvocationRecord {
            tool_name: request.name.clone(),
            target: request.target.clone(),
            input: request.target.clone(),
            outcome: InvocationOutcome::Rejected {
                reason: error.message,
            },
            confidence_before: confidence,
            confidence_after: confidence,
        });
        DispatchResult::Rejected
    }

    fn reject(&self, session: &mut ScoringSession, request: &Option<ToolRequest>, reason: &str) {
        tracing::warn!(session_id = %session.session_id, reason, "assessment reply rejected");
        let confidence = session.latest_confidence();
        session.audit_trail.push(ToolInvocationRecord {
            tool_name: request
                .as_ref()
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "assessment".to_string()),
            target: request
                .as_ref()
                .map(|r| r.target.clone())
                .unwrap_or_default(),
            input: String::new(),
            outcome: InvocationOutcome::Rejected {
                reason: reason.to_string(),
            },
            confidence_before: confidence,
            confidence_after: confidence,
        });
    }
}

enum DispatchResult {
    Executed,
    Rejected,
}

/// Exponential backoff with the doubling capped so large attempt counts
/// cannot overflow the shift.
fn retry_backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    let exponent = attempt.saturating_sub(1).min(16);
    base_ms.saturating_mul(1u64 << exponent)
}

#[cfg(test)]
mod tests {
    use super::retry_backoff_ms;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(retry_backoff_ms(250, 1), 250);
        assert_eq!(retry_backoff_ms(250, 2), 500);
        assert_eq!(retry_backoff_ms(250, 3), 1_000);
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        assert_eq!(retry_backoff_ms(250, 500), 250 * (1u64 << 16));
        assert_eq!(retry_backoff_ms(u64::MAX, 500), u64::MAX);
    }
}
