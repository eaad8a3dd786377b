use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

const USAGE: &str =
    "usage: lexscore [--config <path>] <recompute --corpus <records.json> | modifier <jurisdiction>>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Rebuild the jurisdiction modifier table from a historical corpus file.
    Recompute { corpus: PathBuf },
    /// Print the stored modifier for one jurisdiction.
    Modifier { jurisdiction: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: PathBuf,
    pub command: Command,
}

pub fn parse_args() -> Result<CliArgs> {
    parse_from(env::args().skip(1))
}

fn parse_from(args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut args = args.peekable();
    let mut config_path = None;
    let mut command = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --config"))?;
                config_path = Some(PathBuf::from(value));
            }
            "recompute" => {
                let flag = args
                    .next()
                    .ok_or_else(|| anyhow!("recompute requires --corpus <records.json>"))?;
                if flag != "--corpus" {
                    return Err(anyhow!("unknown recompute argument: {flag}. {USAGE}"));
                }
                let corpus = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --corpus"))?;
                command = Some(Command::Recompute {
                    corpus: PathBuf::from(corpus),
                });
            }
            "modifier" => {
                let jurisdiction = args
                    .next()
                    .ok_or_else(|| anyhow!("modifier requires a jurisdiction name"))?;
                command = Some(Command::Modifier { jurisdiction });
            }
            other => {
                return Err(anyhow!("unknown argument: {other}. {USAGE}"));
            }
        }
    }

    Ok(CliArgs {
        config_path: config_path.unwrap_or_else(|| PathBuf::from("./lexscore.jsonc")),
        command: command.ok_or_else(|| anyhow!("missing command. {USAGE}"))?,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{Command, parse_from};

    fn args(parts: &[&str]) -> impl Iterator<Item = String> {
        parts
            .iter()
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn recompute_command_is_parsed_with_config_override() {
        let parsed = parse_from(args(&[
            "--config",
            "conf/lexscore.jsonc",
            "recompute",
            "--corpus",
            "cases.json",
        ]))
        .expect("args should parse");
        assert_eq!(parsed.config_path, PathBuf::from("conf/lexscore.jsonc"));
        assert_eq!(
            parsed.command,
            Command::Recompute {
                corpus: PathBuf::from("cases.json")
            }
        );
    }

    #[test]
    fn modifier_command_takes_a_jurisdiction() {
        let parsed = parse_from(args(&["modifier", "Kings County"])).expect("args should parse");
        assert_eq!(parsed.config_path, PathBuf::from("./lexscore.jsonc"));
        assert_eq!(
            parsed.command,
            Command::Modifier {
                jurisdiction: "Kings County".to_string()
            }
        );
    }

    #[test]
    fn unknown_arguments_and_missing_commands_are_rejected() {
        assert!(parse_from(args(&["--wat"])).is_err());
        assert!(parse_from(args(&[])).is_err());
        assert!(parse_from(args(&["recompute"])).is_err());
    }
}
