use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use shipment_core::common::config::PipelineCfg;
use shipment_core::common::log::init_tracing;
use shipment_core::inference::service::predict_file;
use shipment_core::registry::ModelResolver;
use shipment_core::PipelineRunner;

#[derive(Parser, Debug)]
#[command(name = "shipment", version, about = "Shipment delay training pipeline")]
struct Cli {
    #[arg(long, global = true, help = "JSON config file; defaults and SHIPMENT_* env otherwise")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Emit logs as JSON lines on stderr")]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline and push a new registry version.
    Run {
        #[arg(long, help = "Fixed run id instead of the current time")]
        run_id: Option<String>,
    },
    /// Print the latest registry version, or `none`.
    Latest {
        #[arg(long, help = "Registry root; the configured saved_model_dir otherwise")]
        root: Option<PathBuf>,
    },
    /// Label each row of a CSV with the latest registry model.
    Predict {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        input: PathBuf,
    },
}

#[derive(Serialize)]
struct JsonOut<T: Serialize> {
    ok: bool,
    data: T,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = PipelineCfg::load(cli.config.as_deref()).context("loading configuration")?;
    init_tracing(cli.log_json || cfg.log_json);

    match cli.command {
        Commands::Run { run_id } => {
            let runner = match run_id {
                Some(id) => PipelineRunner::with_run_id(cfg, id),
                None => PipelineRunner::new(cfg),
            };
            let outcome = runner.run()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&JsonOut {
                    ok: true,
                    data: &outcome.model_pusher
                })?
            );
        }
        Commands::Latest { root } => {
            let root = root.unwrap_or(cfg.saved_model_dir);
            match ModelResolver::new(root).get_latest_version_number() {
                Some(v) => println!("{v}"),
                None => println!("none"),
            }
        }
        Commands::Predict { root, input } => {
            let root = root.unwrap_or(cfg.saved_model_dir);
            let labels = predict_file(&root, &input)
                .with_context(|| format!("predicting {}", input.display()))?;
            for label in labels {
                println!("{label}");
            }
        }
    }

    Ok(())
}
