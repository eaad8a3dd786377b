//! Free-text extraction fallbacks for oracle replies that omit structured
//! fields. Patterns are anchored to the phrasing the assessment prompt asks
//! for, with looser fallbacks for replies that drift from it.

use std::sync::LazyLock;

use regex::Regex;

static CONFIDENCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)confidence\s+score:?\s*\*{0,2}\s*(\d{1,3})\s*/\s*100",
        r"(?i)confidence\s+score:?\s*\*{0,2}\s*(\d{1,3})",
        r"(?i)confidence\s+level:?\s*\*{0,2}\s*(\d{1,3})\s*%",
        r"(?i)confidence:?\s*\*{0,2}\s*(\d{1,3})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("confidence pattern should compile"))
    .collect()
});

static SCORE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)lead\s+score:?\s*\*{0,2}\s*(\d{1,3})\s*/\s*100",
        r"(?i)lead\s+score:?\s*\*{0,2}\s*(\d{1,3})",
        r"(?i)final\s+adjusted\s+score:?\s*\*{0,2}\s*(\d{1,3})",
        r"(?i)score:?\s*\*{0,2}\s*(\d{1,3})\s*/\s*100",
        r"\b(\d{1,3})\s*/\s*100\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("score pattern should compile"))
    .collect()
});

static JURISDICTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)jurisdiction:?\s*\*{0,2}\s*([A-Z][A-Za-z .'-]+?\s+County)\b",
        r"(?i)jurisdiction:?\s*\*{0,2}\s*([A-Z][A-Za-z .'-]+?)(?:\n|\*|,|\.|$)",
        r"\b([A-Z][A-Za-z .'-]+?\s+County)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("jurisdiction pattern should compile"))
    .collect()
});

fn extract_bounded(patterns: &[Regex], text: &str) -> Option<u8> {
    for pattern in patterns {
        if let Some(captures) = pattern.captures(text) {
            let value: u32 = captures[1].parse().ok()?;
            return Some(value.clamp(1, 100) as u8);
        }
    }
    None
}

/// Pull a 1-100 confidence figure out of narrative text. Values above 100
/// clamp down rather than being discarded.
pub fn extract_confidence(text: &str) -> Option<u8> {
    extract_bounded(&CONFIDENCE_PATTERNS, text)
}

/// Pull a 1-100 raw lead score out of narrative text.
pub fn extract_score(text: &str) -> Option<u8> {
    extract_bounded(&SCORE_PATTERNS, text)
}

/// Pull a jurisdiction name out of narrative text. Prefers an explicit
/// "Jurisdiction:" label, falls back to any "<Name> County" mention.
pub fn extract_jurisdiction(text: &str) -> Option<String> {
    for pattern in JURISDICTION_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            let name = captures[1].trim().trim_end_matches('.').trim();
            if name.is_empty() || name.eq_ignore_ascii_case("unknown") {
                continue;
            }
            return Some(name.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{extract_confidence, extract_jurisdiction, extract_score};

    #[test]
    fn confidence_accepts_the_prompted_formats() {
        assert_eq!(
            extract_confidence("Confidence Score: 65/100 based on evidence"),
            Some(65)
        );
        assert_eq!(extract_confidence("**Confidence Score:** 82"), Some(82));
        assert_eq!(extract_confidence("Confidence Level: 45%"), Some(45));
        assert_eq!(extract_confidence("confidence: 30"), Some(30));
        assert_eq!(extract_confidence("no numbers here"), None);
    }

    #[test]
    fn confidence_clamps_out_of_range_values() {
        assert_eq!(extract_confidence("Confidence Score: 250/100"), Some(100));
        assert_eq!(extract_confidence("Confidence Score: 0"), Some(1));
    }

    #[test]
    fn score_prefers_the_labelled_form_over_bare_fractions() {
        let text = "Comparable settled at 40/100 historically. Lead Score: 72/100.";
        assert_eq!(extract_score(text), Some(72));
        assert_eq!(extract_score("Final adjusted score: 88"), Some(88));
        assert_eq!(extract_score("the panel gave 61/100"), Some(61));
        assert_eq!(extract_score("strong case overall"), None);
    }

    #[test]
    fn jurisdiction_extraction_handles_labels_and_county_mentions() {
        assert_eq!(
            extract_jurisdiction("Jurisdiction: Kings County\nLead Score: 70/100"),
            Some("Kings County".to_string())
        );
        assert_eq!(
            extract_jurisdiction("**Jurisdiction:** Queens County, New York"),
            Some("Queens County".to_string())
        );
        assert_eq!(
            extract_jurisdiction("venue appears to be Nassau County per the report"),
            Some("Nassau County".to_string())
        );
        assert_eq!(extract_jurisdiction("Jurisdiction: unknown"), None);
        assert_eq!(extract_jurisdiction("no venue was identified"), None);
    }
}
