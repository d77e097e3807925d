mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use vinyl_export::commands::{self, chapters, export, probe};
use vinyl_export::config::AppConfig;
use vinyl_export::export::ExportOutcome;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    vinyl_export::init_logging();

    let config = AppConfig::load_or_default(cli.config.as_deref())
        .with_context(|| format!("failed to load config {:?}", cli.config))?;
    let engine = commands::engine_from_config(&config);

    match cli.command {
        Commands::Chapters { file, json } => {
            let found = chapters::list_chapters(engine, &config.chapters, &file).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                print!("{}", chapters::format_chapters(&found));
            }
        }
        Commands::Probe { file } => {
            let report = probe::probe_file(engine, &config.chapters, &file).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Export { playlist, out } => {
            let outcome =
                export::export_playlist_file(engine, config.export.clone(), &playlist, &out)
                    .await?;
            match outcome {
                ExportOutcome::Completed(summary) => {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                ExportOutcome::Skipped => println!("Export already in progress"),
            }
        }
    }

    Ok(())
}
