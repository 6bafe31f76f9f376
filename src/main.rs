use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lightbox::app::AppContext;
use lightbox::cli::{commands, Cli, Commands, DaemonAction};
use lightbox::daemon::{self, Daemon, DaemonConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::new(cli.db)?;

    match cli.command {
        Commands::Sync => {
            commands::sync(&ctx).await?;
        }
        Commands::List { favorites } => {
            commands::list(&ctx, favorites)?;
        }
        Commands::Show { id } => {
            commands::show(&ctx, &id)?;
        }
        Commands::Favorite { id } => {
            commands::favorite(&ctx, &id)?;
        }
        Commands::Status => {
            commands::status(&ctx)?;
        }
        Commands::Watch => {
            commands::watch(Arc::new(ctx)).await?;
        }
        Commands::Daemon { action } => match action {
            DaemonAction::Start {
                interval,
                no_initial_update,
                log,
            } => {
                let interval = interval.unwrap_or_else(|| ctx.config.sync.interval.clone());
                let config = DaemonConfig {
                    update_interval_secs: DaemonConfig::parse_interval(&interval)?,
                    update_on_start: !no_initial_update && ctx.config.sync.update_on_start,
                    log_file: log,
                };
                Daemon::new(Arc::new(ctx), config).run().await?;
            }
            DaemonAction::Stop => {
                daemon::stop_daemon()?;
                println!("Daemon stopped");
            }
            DaemonAction::Status => {
                println!("{}", daemon::daemon_status());
            }
        },
    }

    Ok(())
}
