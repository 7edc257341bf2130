//! OS signal mapping.
//!
//! | Signal           | Event          |
//! |------------------|----------------|
//! | SIGHUP           | `Reload`       |
//! | SIGTERM, SIGINT  | `GracefulStop` |
//! | SIGQUIT          | `HardStop`     |
//! | SIGUSR1, SIGUSR2 | `Unrecognized` |
//!
//! SIGKILL cannot be caught; the OS ends the process without any of this.

use crate::control::ControlEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Forwards OS signals to `events` until the receiver is dropped.
#[cfg(unix)]
pub fn spawn_signal_listener(events: mpsc::Sender<ControlEvent>) -> JoinHandle<()> {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let streams = (
            signal(SignalKind::hangup()),
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
            signal(SignalKind::quit()),
            signal(SignalKind::user_defined1()),
            signal(SignalKind::user_defined2()),
        );
        let (Ok(mut hup), Ok(mut term), Ok(mut int), Ok(mut quit), Ok(mut usr1), Ok(mut usr2)) = streams
        else {
            error!("failed to install signal handlers");
            return;
        };

        loop {
            let (name, event) = tokio::select! {
                _ = hup.recv() => ("SIGHUP", ControlEvent::Reload),
                _ = term.recv() => ("SIGTERM", ControlEvent::GracefulStop),
                _ = int.recv() => ("SIGINT", ControlEvent::GracefulStop),
                _ = quit.recv() => ("SIGQUIT", ControlEvent::HardStop),
                _ = usr1.recv() => ("SIGUSR1", ControlEvent::Unrecognized("SIGUSR1".into())),
                _ = usr2.recv() => ("SIGUSR2", ControlEvent::Unrecognized("SIGUSR2".into())),
            };
            info!(signal = name, ?event, "received signal");

            if events.send(event).await.is_err() {
                return;
            }
        }
    })
}

/// Forwards Ctrl-C as a graceful stop.
#[cfg(not(unix))]
pub fn spawn_signal_listener(events: mpsc::Sender<ControlEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C");
                return;
            }
            info!(signal = "ctrl-c", "received signal");
            if events.send(ControlEvent::GracefulStop).await.is_err() {
                return;
            }
        }
    })
}
