use anyhow::{Context, Result};
use clap::Parser;
use podium_cli::cli::{Cli, Command, ConfigCommand};
use podium_cli::inspect::inspect_snapshot;
use podium_cli::logging::{default_log_dir, setup_logging};
use podium_cli::replay::run_replay;
use podium_cli::settings::Settings;
use podium_core::SelectorResolver;
use podium_events::publish_config;
use tracing::{debug, info, warn};

/// Saved settings with the `--selectors` file merged in. Never stored back.
fn runtime_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load()?;
    if let Some(path) = &cli.selectors {
        settings.merge_selector_file(path)?;
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_dir = cli.log_dir.clone().unwrap_or_else(default_log_dir);
    setup_logging(&log_dir, cli.debug)?;
    debug!(log_dir = %log_dir.display(), "starting podium");

    match &cli.command {
        Command::Replay(args) => {
            let settings = runtime_settings(&cli)?;
            run_replay(args, &settings, std::io::stdout()).await?;
        }
        Command::Inspect(args) => {
            let settings = runtime_settings(&cli)?;
            let resolver = SelectorResolver::new(settings.selector_table());
            let infos = inspect_snapshot(&resolver, &args.snapshot, args.target)?;
            println!("{}", serde_json::to_string_pretty(&infos)?);
        }
        Command::Config { subcommand } => match subcommand {
            ConfigCommand::Show => {
                let settings = Settings::load()?;
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
            ConfigCommand::Set(args) => {
                let mut settings = Settings::load()?;
                if args.is_empty() {
                    warn!("no settings given, nothing to change");
                } else if settings.apply(args) {
                    settings.store()?;
                    // Reaches sessions of this process only; others load the stored file.
                    publish_config(&settings.presentation)
                        .context("failed to publish configuration")?;
                    info!("settings saved");
                } else {
                    info!("settings unchanged");
                }
                println!("{}", serde_json::to_string_pretty(&settings.presentation)?);
            }
        },
    }

    Ok(())
}
