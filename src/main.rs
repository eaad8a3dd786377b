use std::fs;

use anyhow::{Context, Result};

use lexscore::{
    cli::{Command, parse_args},
    config::Config,
    jurisdiction::JurisdictionScoreManager,
    logging::init_tracing,
    scoring::HistoricalCaseRecord,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;
    let config = Config::load(&args.config_path)
        .with_context(|| format!("failed to load config from {}", args.config_path.display()))?;
    let _logging_guard = init_tracing(&config.logging)?;

    let manager = JurisdictionScoreManager::open(config.jurisdiction.clone())
        .context("failed to open jurisdiction score manager")?;

    match args.command {
        Command::Recompute { corpus } => {
            let corpus_content = fs::read_to_string(&corpus)
                .with_context(|| format!("failed to read corpus {}", corpus.display()))?;
            let records: Vec<HistoricalCaseRecord> = serde_json::from_str(&corpus_content)
                .with_context(|| format!("failed to parse corpus {}", corpus.display()))?;

            let table = manager
                .recompute(&records)
                .context("failed to recompute jurisdiction table")?;
            println!(
                "recomputed {} jurisdictions from {} records into {}",
                table.len(),
                records.len(),
                config.jurisdiction.table_path.display()
            );
            for (jurisdiction, stats) in &table {
                println!(
                    "  {jurisdiction}: cases={} modifier={:.3}",
                    stats.case_count, stats.modifier
                );
            }
        }
        Command::Modifier { jurisdiction } => {
            let modifier = manager.get_modifier(&jurisdiction);
            println!("{jurisdiction}: {modifier:.3}");
        }
    }

    Ok(())
}
