use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Continue,
    Finalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateLimits {
    pub finalize_threshold: u8,
    pub tool_call_limit: u32,
}

/// Pure loop-continuation decision. Budget exhaustion overrides confidence;
/// otherwise any confidence below the finalize threshold continues. Bands are
/// inclusive on their lower bound: exactly `finalize_threshold` finalizes,
/// and confidence below 20 is treated the same as the mandatory 20-79 band.
pub fn evaluate(confidence: u8, calls_made: u32, limits: &GateLimits) -> GateDecision {
    if calls_made >= limits.tool_call_limit {
        return GateDecision::Finalize;
    }
    if confidence >= limits.finalize_threshold {
        return GateDecision::Finalize;
    }
    GateDecision::Continue
}
