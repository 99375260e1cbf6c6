//! # Deponent CLI
//!
//! Finds contradictions in a deposition transcript.
//!
//! # Usage
//!
//! ```bash
//! deponent --init-config > deponent.toml
//! deponent segment --input depo.txt
//! deponent --config deponent.toml analyze --input depo.txt --output report.json
//! ```
//!
//! Configuration is read from `--config` (or `DEPONENT_CONFIG`); `DEPONENT_*`
//! environment variables override file values.

mod telemetry;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use deponent_config::DeponentConfig;
use deponent_core::{DocumentInfo, TranscriptSegmenter};
use deponent_extraction::{AnalysisPipeline, AnalysisProgress};

#[derive(Debug, Parser)]
#[command(name = "deponent", version, about = "Deposition contradiction analysis")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true, env = "DEPONENT_CONFIG")]
    config: Option<PathBuf>,

    /// Print a commented example configuration and exit.
    #[arg(long)]
    init_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Split a transcript into question/answer utterances and print them as JSON.
    Segment {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Run the full contradiction analysis and print the report as JSON.
    Analyze {
        #[command(flatten)]
        source: SourceArgs,
        /// Report title (defaults to the input file name).
        #[arg(long)]
        title: Option<String>,
        /// Write the report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Override `analysis.top_k`.
        #[arg(long)]
        top_k: Option<usize>,
        /// Override `analysis.similarity_threshold`.
        #[arg(long)]
        threshold: Option<f32>,
    },
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Plain-text transcript.
    #[arg(long, short)]
    input: PathBuf,
    /// Document id used in utterance and claim ids (defaults to the file stem).
    #[arg(long)]
    document_id: Option<String>,
}

impl SourceArgs {
    fn read(&self) -> anyhow::Result<String> {
        std::fs::read_to_string(&self.input)
            .with_context(|| format!("Failed to read transcript {}", self.input.display()))
    }

    fn document_id(&self) -> String {
        self.document_id
            .clone()
            .unwrap_or_else(|| file_stem(&self.input))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "transcript".to_string())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DeponentConfig> {
    let mut config = match path {
        Some(path) => {
            let path = path.to_string_lossy();
            DeponentConfig::from_file(&path)
                .with_context(|| format!("Failed to load config from {}", path))?
        }
        None => DeponentConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.init_config {
        print!("{}", DeponentConfig::example_toml_commented());
        return Ok(());
    }
    let Some(command) = cli.command else {
        anyhow::bail!("no command given; run `deponent --help` for usage");
    };

    let mut config = load_config(cli.config.as_deref())?;
    telemetry::init_logging(&config.logging.log_level, &config.logging.log_format)?;

    match command {
        Command::Segment { source } => {
            let raw = source.read()?;
            let segmentation = TranscriptSegmenter::new().segment(&source.document_id(), &raw)?;
            info!(
                utterances = segmentation.utterances.len(),
                answers = segmentation.answer_count(),
                "Segmentation complete"
            );
            println!("{}", serde_json::to_string_pretty(&segmentation.utterances)?);
        }
        Command::Analyze {
            source,
            title,
            output,
            top_k,
            threshold,
        } => {
            if let Some(top_k) = top_k {
                config.analysis.top_k = top_k;
            }
            if let Some(threshold) = threshold {
                config.analysis.similarity_threshold = threshold;
            }
            config.validate()?;

            let raw = source.read()?;
            let title = title.unwrap_or_else(|| file_stem(&source.input));
            let document = DocumentInfo::new(source.document_id(), title);

            let pipeline = AnalysisPipeline::from_config(&config)?;
            let progress = |event: &AnalysisProgress| {
                if let AnalysisProgress::ClaimAnalyzed {
                    processed,
                    total,
                    contradictions_so_far,
                } = event
                {
                    info!(processed, total, contradictions_so_far, "Progress");
                }
            };
            let outcome = pipeline
                .analyze(document, &raw, Some(&progress), None)
                .await?;

            let json = serde_json::to_string_pretty(&outcome.report)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write report {}", path.display()))?;
                    info!(path = %path.display(), "Report written");
                }
                None => println!("{}", json),
            }
            info!(
                claims = outcome.statistics.total_claims,
                contradictions = outcome.statistics.total_contradictions,
                pairs_failed = outcome.statistics.pairs_failed,
                "Analysis complete"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze_overrides() {
        let cli = Cli::try_parse_from([
            "deponent",
            "analyze",
            "--input",
            "depo.txt",
            "--top-k",
            "3",
            "--threshold",
            "0.8",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Analyze {
                source,
                top_k,
                threshold,
                ..
            }) => {
                assert_eq!(source.document_id(), "depo");
                assert_eq!(top_k, Some(3));
                assert_eq!(threshold, Some(0.8));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_file_stem_fallback() {
        assert_eq!(file_stem(Path::new("/tmp/reeves_depo.txt")), "reeves_depo");
        assert_eq!(file_stem(Path::new("/")), "transcript");
    }
}
