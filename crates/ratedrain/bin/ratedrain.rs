//! ratedrain: consume a demo queue at a reloadable rate.
//!
//! Run with: `cargo run -p ratedrain -- --env-file .env`
//!
//! Edit `RATELIMIT` in the env file and send SIGHUP to apply it. SIGTERM or
//! Ctrl-C drains and exits 0; SIGQUIT exits 1 immediately.

use clap::Parser;
use ratedrain::{init_logging, spawn_signal_listener, EnvFileSource, Service, Settings};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let settings = Settings::parse();
    init_logging(settings.log_format);

    let source = Arc::new(EnvFileSource::new(&settings.env_file));
    let service = match Service::start(&settings, source) {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "startup failed");
            std::process::exit(1);
        }
    };

    let (events, rx) = mpsc::channel(16);
    let _signals = spawn_signal_listener(events);

    let outcome = service.run(rx).await;
    let code = outcome.exit_code();
    info!(kind = ?outcome.kind, code, "exiting");
    std::process::exit(code);
}
