mod cli;
mod config;
mod demo;
mod headless;
mod native;
mod updater;

use std::path::Path;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = cli::parse();

    let config = match config::HostConfig::load(args.config.as_deref().map(Path::new)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("atrium: {e}");
            std::process::exit(2);
        }
    };

    let directive = args.log_level.as_deref().unwrap_or(&config.log_directive);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| "atrium=info".parse().unwrap()),
            ),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting atrium");

    // Utility mode: trash a path and exit.
    if let Some(path) = &args.trash {
        match native::move_to_trash(Path::new(path)) {
            Ok(target) => {
                info!(target = %target.display(), "trashed");
                return;
            }
            Err(e) => {
                error!(error = %e, "trash failed");
                std::process::exit(1);
            }
        }
    }

    if args.check_updates || config.updates.check_on_launch {
        run_update_cycle(&config).await;
    }

    if let Err(e) = demo::run(&config).await {
        error!(error = %e, "host error");
        std::process::exit(1);
    }
}

/// Launch-time update pass: check, stage a download if one is available,
/// apply a previously staged one. Failures are logged, never fatal.
async fn run_update_cycle(config: &config::HostConfig) {
    let updater = updater::Updater::new(&config.updates.feed);
    let update = updater.check_for_update().await;

    if update.update_available {
        info!("update available");
        if let Some(release) = &update.release {
            if let Err(e) = updater.download_update(release).await {
                warn!(error = %e, "update download failed");
            }
        }
    }

    if update.update_ready {
        info!("applying staged update");
        if let Err(e) = updater.apply_update() {
            warn!(error = %e, "update apply failed");
        }
    }
}
