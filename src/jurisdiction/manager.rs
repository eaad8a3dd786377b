use std::{
    collections::BTreeMap,
    sync::RwLock,
};

use time::{Date, OffsetDateTime, macros::format_description};

use crate::{
    config::JurisdictionConfig,
    jurisdiction::{
        error::JurisdictionError,
        persistence::TablePersistence,
        types::{JurisdictionStatistics, JurisdictionTable},
    },
    scoring::ports::ModifierLookupPort,
    scoring::types::HistoricalCaseRecord,
};

/// Blends a small-sample estimate toward the global average in proportion to
/// how much data backs it. Returns `(confidence, adjusted_score)`.
pub fn shrink(
    raw_score: f64,
    case_count: u64,
    global_average: f64,
    conservative_factor: f64,
) -> (f64, f64) {
    let count = case_count as f64;
    let confidence = count / (count + conservative_factor.max(0.0));
    let adjusted = confidence * raw_score + (1.0 - confidence) * global_average;
    (confidence, adjusted)
}

/// Normalizes a raw settlement string (`"$124,000"`, `"98500.50"`) into a
/// positive value. Missing, non-numeric, or non-positive settlements exclude
/// the record from scoring.
pub fn parse_settlement(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(['$', ','], "");
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("null") {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    (value > 0.0).then_some(value)
}

/// Computes and serves the per-jurisdiction score modifier table. Recomputed
/// in batch over the full historical corpus; lookups never extrapolate from
/// zero data.
pub struct JurisdictionScoreManager {
    config: JurisdictionConfig,
    persistence: TablePersistence,
    table: RwLock<JurisdictionTable>,
}

impl JurisdictionScoreManager {
    /// Opens the manager over the configured table path, loading any
    /// previously persisted table.
    pub fn open(config: JurisdictionConfig) -> Result<Self, JurisdictionError> {
        let persistence = TablePersistence::new(config.table_path.clone());
        let table = persistence.load()?.unwrap_or_default();
        Ok(Self {
            config,
            persistence,
            table: RwLock::new(table),
        })
    }

    pub fn table_snapshot(&self) -> JurisdictionTable {
        self.table
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Recomputes the whole table from the corpus, persists it wholesale, and
    /// swaps it in for subsequent lookups.
    pub fn recompute(
        &self,
        corpus: &[HistoricalCaseRecord],
    ) -> Result<JurisdictionTable, JurisdictionError> {
        let table = self.compute_table(corpus);
        self.persistence.save(&table)?;
        if let Ok(mut guard) = self.table.write() {
            *guard = table.clone();
        }
        tracing::info!(
            target: "jurisdiction",
            jurisdictions = table.len(),
            corpus_records = corpus.len(),
            table_path = %self.persistence.path().display(),
            "jurisdiction_table_recomputed"
        );
        Ok(table)
    }

    /// Returns the bounded score modifier for `jurisdiction`, or exactly 1.0
    /// when the jurisdiction is unknown or carries no cases.
    pub fn get_modifier(&self, jurisdiction: &str) -> f64 {
        let guard = match self.table.read() {
            Ok(guard) => guard,
            Err(_) => return 1.0,
        };
        match guard.get(jurisdiction) {
            Some(stats) if stats.case_count > 0 => stats.modifier,
            _ => 1.0,
        }
    }

    fn compute_table(&self, corpus: &[HistoricalCaseRecord]) -> JurisdictionTable {
        struct Accumulator {
            weighted_settlement_sum: f64,
            weight_sum: f64,
            case_count: u64,
        }

        let today = OffsetDateTime::now_utc().date();
        let mut per_jurisdiction: BTreeMap<String, Accumulator> = BTreeMap::new();

        for record in corpus {
            let jurisdiction = record.jurisdiction.trim();
            if jurisdiction.is_empty() {
                continue;
            }
            let Some(settlement) = record
                .settlement_value
                .as_deref()
                .and_then(parse_settlement)
            else {
                continue;
            };

            let age_years = self.case_age_years(record, today);
            let weight = self.recency_multiplier(age_years) * self.quality_multiplier(record);
            if weight <= 0.0 {
                continue;
            }

            let acc = per_jurisdiction
                .entry(jurisdiction.to_string())
                .or_insert(Accumulator {
                    weighted_settlement_sum: 0.0,
                    weight_sum: 0.0,
                    case_count: 0,
                });
            acc.weighted_settlement_sum += settlement * weight;
            acc.weight_sum += weight;
            acc.case_count += 1;
        }

        let raw_scores: BTreeMap<String, (f64, u64)> = per_jurisdiction
            .into_iter()
            .filter(|(_, acc)| acc.weight_sum > 0.0)
            .map(|(jurisdiction, acc)| {
                (
                    jurisdiction,
                    (acc.weighted_settlement_sum / acc.weight_sum, acc.case_count),
                )
            })
            .collect();

        if raw_scores.is_empty() {
            return JurisdictionTable::new();
        }

        let total_cases: u64 = raw_scores.values().map(|(_, count)| count).sum();
        let global_average = raw_scores
            .values()
            .map(|(raw, count)| raw * (*count as f64))
            .sum::<f64>()
            / (total_cases as f64).max(1.0);

        let adjusted: BTreeMap<String, (f64, u64, f64)> = raw_scores
            .into_iter()
            .map(|(jurisdiction, (raw, count))| {
                let (_, adjusted_score) =
                    shrink(raw, count, global_average, self.config.conservative_factor);
                (jurisdiction, (raw, count, adjusted_score))
            })
            .collect();

        let adjusted_global_average = adjusted
            .values()
            .map(|(_, _, adjusted_score)| adjusted_score)
            .sum::<f64>()
            / adjusted.len() as f64;

        adjusted
            .into_iter()
            .map(|(jurisdiction, (raw_score, case_count, adjusted_score))| {
                let modifier = if adjusted_global_average > 0.0 {
                    (adjusted_score / adjusted_global_average)
                        .clamp(self.config.modifier_bounds.min, self.config.modifier_bounds.max)
                } else {
                    1.0
                };
                (
                    jurisdiction.clone(),
                    JurisdictionStatistics {
                        jurisdiction,
                        case_count,
                        raw_score,
                        adjusted_score,
                        modifier,
                    },
                )
            })
            .collect()
    }

    /// Weighted presence ratio over the configured field weights.
    pub fn completeness(&self, record: &HistoricalCaseRecord) -> f64 {
        let mut weighted_present = 0.0;
        let mut possible_weight = 0.0;
        for (field, weight) in &self.config.field_weights {
            if *weight <= 0.0 {
                continue;
            }
            possible_weight += weight;
            if record.field_present(field) {
                weighted_present += weight;
            }
        }

        if possible_weight <= 0.0 {
            return 0.0;
        }
        weighted_present / possible_weight
    }

    // sqrt flattens the curve: gains on sparse records count for more than
    // gains on records that are already nearly complete.
    fn quality_multiplier(&self, record: &HistoricalCaseRecord) -> f64 {
        self.completeness(record).sqrt()
    }

    fn recency_multiplier(&self, age_years: f64) -> f64 {
        for band in &self.config.recency_bands {
            if age_years <= band.max_age_years {
                return band.multiplier;
            }
        }
        self.config.recency_fallback_multiplier
    }

    fn case_age_years(&self, record: &HistoricalCaseRecord, today: Date) -> f64 {
        let format = format_description!("[year]-[month]-[day]");
        let Some(raw) = record.incident_date.as_deref() else {
            return self.config.default_case_age_years;
        };
        match Date::parse(raw.trim(), &format) {
            Ok(date) => ((today - date).whole_days() as f64 / 365.25).max(0.0),
            Err(_) => self.config.default_case_age_years,
        }
    }
}

impl ModifierLookupPort for JurisdictionScoreManager {
    fn modifier_for(&self, jurisdiction: &str) -> f64 {
        self.get_modifier(jurisdiction)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use uuid::Uuid;

    use crate::{
        config::JurisdictionConfig,
        scoring::types::HistoricalCaseRecord,
    };

    use super::{JurisdictionScoreManager, parse_settlement, shrink};

    fn test_config() -> (JurisdictionConfig, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("lexscore-jur-test-{}", Uuid::now_v7()));
        let mut config = JurisdictionConfig::default();
        config.table_path = dir.join("jurisdictions.json");
        (config, dir)
    }

    fn record(jurisdiction: &str, settlement: &str, incident_date: &str) -> HistoricalCaseRecord {
        HistoricalCaseRecord {
            case_id: format!("case-{}", Uuid::now_v7()),
            jurisdiction: jurisdiction.to_string(),
            case_type: "slip_and_fall".to_string(),
            injuries_described: "fractured wrist".to_string(),
            settlement_value: Some(settlement.to_string()),
            case_outcome: "settled".to_string(),
            incident_date: Some(incident_date.to_string()),
            source: "cases/depo.pdf".to_string(),
            summary: "premises liability settlement".to_string(),
            key_phrases: vec!["wet floor".to_string()],
        }
    }

    #[test]
    fn settlement_parsing_normalizes_currency_text() {
        assert_eq!(parse_settlement("$124,000"), Some(124_000.0));
        assert_eq!(parse_settlement("98500.50"), Some(98_500.5));
        assert_eq!(parse_settlement("null"), None);
        assert_eq!(parse_settlement(""), None);
        assert_eq!(parse_settlement("$0"), None);
        assert_eq!(parse_settlement("-500"), None);
        assert_eq!(parse_settlement("pending"), None);
    }

    #[test]
    fn shrinkage_matches_known_values_for_a_deep_sample() {
        // 100 cases at 124k against a 109k global average.
        let (confidence, adjusted) = shrink(124_000.0, 100, 109_000.0, 10.0);
        assert!((confidence - 0.909).abs() < 0.001);
        assert!((adjusted - 122_636.0).abs() < 10.0);
    }

    #[test]
    fn shrinkage_pulls_a_shallow_outlier_toward_the_global_average() {
        // 8 cases at 350k: raw value is 3.2x the average, the adjusted score
        // must land far below it.
        let (confidence, adjusted) = shrink(350_000.0, 8, 109_000.0, 10.0);
        assert!((confidence - 8.0 / 18.0).abs() < 1e-9);
        assert!((adjusted - 216_111.0).abs() < 150.0);
        assert!(adjusted < 250_000.0);
    }

    #[test]
    fn shrinkage_limits_hold_at_the_extremes() {
        let (_, adjusted_deep) = shrink(124_000.0, 1_000_000, 109_000.0, 10.0);
        assert!((adjusted_deep - 124_000.0).abs() < 5.0);

        let (confidence_zero, adjusted_zero) = shrink(124_000.0, 0, 109_000.0, 10.0);
        assert_eq!(confidence_zero, 0.0);
        assert!((adjusted_zero - 109_000.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_jurisdiction_falls_back_to_identity_modifier() {
        let (config, dir) = test_config();
        let manager = JurisdictionScoreManager::open(config).expect("open should succeed");
        assert_eq!(manager.get_modifier("Atlantis County"), 1.0);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn recompute_bounds_modifiers_and_persists_the_table() {
        let (config, dir) = test_config();
        let manager = JurisdictionScoreManager::open(config.clone()).expect("open should succeed");

        let mut corpus = Vec::new();
        for _ in 0..40 {
            corpus.push(record("Suffolk County", "$124,000", "2025-11-01"));
        }
        for _ in 0..25 {
            corpus.push(record("Nassau County", "$63,425", "2025-11-01"));
        }
        for _ in 0..8 {
            corpus.push(record("Queens County", "$350,000", "2025-11-01"));
        }

        let table = manager.recompute(&corpus).expect("recompute should succeed");
        assert_eq!(table.len(), 3);
        assert_eq!(
            manager.table_snapshot(),
            table,
            "lookups should serve the freshly computed table"
        );
        for stats in table.values() {
            assert!(stats.modifier >= 0.8 && stats.modifier <= 1.15);
        }
        // Queens is a shallow outlier: shrinkage plus the cap keeps it at the
        // upper bound instead of the naive 3x a raw-average approach yields.
        assert_eq!(table["Queens County"].modifier, 1.15);
        assert!(table["Queens County"].adjusted_score < 350_000.0);

        // A fresh manager over the same path serves the persisted table.
        let reloaded = JurisdictionScoreManager::open(config).expect("reopen should succeed");
        assert_eq!(reloaded.get_modifier("Queens County"), 1.15);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn records_without_usable_settlements_are_excluded() {
        let (config, dir) = test_config();
        let manager = JurisdictionScoreManager::open(config).expect("open should succeed");

        let mut pending = record("Kings County", "pending", "2025-01-01");
        pending.settlement_value = Some("pending".to_string());
        let corpus = vec![pending, {
            let mut r = record("Kings County", "$1", "2025-01-01");
            r.settlement_value = None;
            r
        }];

        let table = manager.recompute(&corpus).expect("recompute should succeed");
        assert!(table.is_empty());
        assert_eq!(manager.get_modifier("Kings County"), 1.0);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn older_cases_carry_less_weight() {
        let (config, dir) = test_config();
        let manager = JurisdictionScoreManager::open(config).expect("open should succeed");
        let recent = record("Suffolk County", "$100", "2026-08-01");
        let stale = record("Suffolk County", "$100", "2015-01-01");

        let today = time::OffsetDateTime::now_utc().date();
        let recent_age = manager.case_age_years(&recent, today);
        let stale_age = manager.case_age_years(&stale, today);
        assert!(manager.recency_multiplier(recent_age) > manager.recency_multiplier(stale_age));
        // Unparseable dates default to the stale end of the table.
        let mut undated = record("Suffolk County", "$100", "not-a-date");
        undated.incident_date = Some("not-a-date".to_string());
        assert_eq!(
            manager.case_age_years(&undated, today),
            manager.config.default_case_age_years
        );
        let _ = fs::remove_dir_all(&dir);
    }
}
