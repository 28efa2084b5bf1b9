use std::path::PathBuf;

use assessment_recommender::Result;
use assessment_recommender::commands::{evaluate_predictions, predict, recommend, serve};
use assessment_recommender::config::{get_config_dir, run_interactive_config, show_config};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "assessment-recommender")]
#[command(about = "Recommend assessments for a job description or hiring query")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the encoder, catalog and server
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Start the HTTP server
    Serve,
    /// Print recommendations for a query
    Recommend {
        /// Free-text query or job description
        query: String,
        /// Number of results (defaults to the configured value)
        #[arg(long)]
        top_k: Option<usize>,
        /// Plain top-k instead of a K/P balanced list
        #[arg(long)]
        no_balance: bool,
    },
    /// Compute mean Recall@K of a predictions CSV
    Evaluate {
        /// CSV with Query and Assessment_url columns
        #[arg(long)]
        ground_truth: PathBuf,
        /// CSV with Query and Assessment_url columns
        #[arg(long)]
        predictions: PathBuf,
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
    /// Generate a predictions CSV by querying a running server
    Predict {
        /// CSV with a Query column
        #[arg(long)]
        test_csv: PathBuf,
        #[arg(long, default_value = "http://127.0.0.1:8000")]
        api_base: String,
        #[arg(long, default_value = "predictions.csv")]
        out_csv: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir().map_err(anyhow::Error::from)?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Serve => {
            serve(&config_dir).await?;
        }
        Commands::Recommend {
            query,
            top_k,
            no_balance,
        } => {
            recommend(&config_dir, &query, top_k, no_balance)?;
        }
        Commands::Evaluate {
            ground_truth,
            predictions,
            k,
        } => {
            evaluate_predictions(&ground_truth, &predictions, k)?;
        }
        Commands::Predict {
            test_csv,
            api_base,
            out_csv,
        } => {
            predict(&test_csv, &api_base, &out_csv)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn serve_command() {
        let cli = Cli::try_parse_from(["assessment-recommender", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Serve));
            assert!(parsed.config_dir.is_none());
        }
    }

    #[test]
    fn recommend_defaults() {
        let cli = Cli::try_parse_from(["assessment-recommender", "recommend", "java developer"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Recommend {
                query,
                top_k,
                no_balance,
            } = parsed.command
            {
                assert_eq!(query, "java developer");
                assert_eq!(top_k, None);
                assert!(!no_balance);
            }
        }
    }

    #[test]
    fn recommend_with_options() {
        let cli = Cli::try_parse_from([
            "assessment-recommender",
            "recommend",
            "sales manager",
            "--top-k",
            "5",
            "--no-balance",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Recommend {
                top_k, no_balance, ..
            } = parsed.command
            {
                assert_eq!(top_k, Some(5));
                assert!(no_balance);
            }
        }
    }

    #[test]
    fn evaluate_default_k() {
        let cli = Cli::try_parse_from([
            "assessment-recommender",
            "evaluate",
            "--ground-truth",
            "gt.csv",
            "--predictions",
            "pred.csv",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Evaluate {
                ground_truth,
                predictions,
                k,
            } = parsed.command
            {
                assert_eq!(ground_truth, PathBuf::from("gt.csv"));
                assert_eq!(predictions, PathBuf::from("pred.csv"));
                assert_eq!(k, 10);
            }
        }
    }

    #[test]
    fn predict_defaults() {
        let cli = Cli::try_parse_from([
            "assessment-recommender",
            "predict",
            "--test-csv",
            "test.csv",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Predict {
                api_base, out_csv, ..
            } = parsed.command
            {
                assert_eq!(api_base, "http://127.0.0.1:8000");
                assert_eq!(out_csv, PathBuf::from("predictions.csv"));
            }
        }
    }

    #[test]
    fn global_config_dir() {
        let cli = Cli::try_parse_from([
            "assessment-recommender",
            "config",
            "--show",
            "--config-dir",
            "/tmp/recommender",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/recommender")));
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn evaluate_requires_files() {
        let cli = Cli::try_parse_from(["assessment-recommender", "evaluate"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["assessment-recommender", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["assessment-recommender", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
