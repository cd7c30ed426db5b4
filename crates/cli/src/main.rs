mod cli;
mod collab;
mod signals;
mod sock;

use crate::cli::Cli;
use crate::signals::{SignalEvent, wait_for_signal};
use clap::Parser;
use config::Config;
use flume::bounded;
use std::sync::{Arc, Mutex};
use throne::{ControlEvent, FileFlagStore, ScanCoordinator, ThroneTracker, TrustStores};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // NOTE: The verbosity flag takes precedence over the environment variable
    // for log control. For example, `THRONED_LOG=warn throned -vvv` will
    // still log at the trace level. The environment variable (`THRONED_LOG`)
    // can only set the log level per crate, not override the verbosity flag.
    // Eg. `THRONED_LOG=throne=warn throned -vvv` will log at the trace level
    // for all crates except `throne` which will log at the warn level.
    let env_filter = EnvFilter::builder()
        .with_env_var("THRONED_LOG")
        .from_env()?
        .add_directive(cli.verbosity.log_level_filter().as_str().parse()?);

    let layer = tracing_subscriber::fmt::layer()
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .init();

    // load config
    let config = match &cli.conffile {
        Some(path) => Config::load(path)?,
        _ => {
            let mut candidates = glob::glob("/etc/throned/config.d/*.toml")?
                .filter_map(Result::ok)
                .collect::<Vec<_>>();
            candidates.insert(0, "/etc/throned/config.toml".into());
            trace!(?candidates, "config file candidates");
            Config::load_multiple(candidates)?
        }
    };
    debug!(?config, ?cli);

    // install signal handlers
    let (signals_tx, signals_rx) = bounded(8);
    let mut signal_handle = tokio::spawn(async move { wait_for_signal(signals_tx).await });

    let coordinator = ScanCoordinator::spawn(FileFlagStore::new(
        config.persistence.scanner_flag.clone(),
    ));
    let stores = Arc::new(Mutex::new(TrustStores::new(
        config.gate.pending_capacity,
        config.gate.pending_decay_threshold,
    )));

    let cancel = CancellationToken::new();
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    // scanner coordination socket
    let socket = cli
        .socket
        .clone()
        .unwrap_or_else(|| config.persistence.socket.clone());
    let mut sock_handle = tokio::spawn(sock::serve(
        socket,
        Arc::clone(&coordinator),
        control_tx.clone(),
        cancel.clone(),
    ));

    // periodic tracker loop
    let mut tracker = ThroneTracker::new(
        config,
        collab::default_services(),
        Arc::clone(&stores),
        Arc::clone(&coordinator),
    );
    let tracker_cancel = cancel.clone();
    let mut tracker_handle =
        tokio::spawn(async move { tracker.run_until(tracker_cancel, control_rx).await });

    loop {
        tokio::select! {
            // bubble up any errors from the signal handlers
            res = &mut signal_handle => {
                let res = res?;
                if let Err(err) = &res {
                    error!("error happened during handling signals: {}", err);
                }
                res?
            }

            // bubble up any errors from the socket server
            res = &mut sock_handle => {
                let res = res?;
                if let Err(err) = &res {
                    error!("error happened in the scanner socket: {}", err);
                }
                // the socket server only returns after cancellation
                res?;
                break;
            }

            // tracker loop only returns after cancellation
            res = &mut tracker_handle => {
                let res = res?;
                if let Err(err) = &res {
                    error!("error happened in the tracker: {}", err);
                }
                res?;
                break;
            }

            // handle the signal events
            event_res = signals_rx.recv_async() => {
                let event = event_res?;
                debug!(?event, "Received signal event");

                match event {
                    SignalEvent::TrackNow => {
                        control_tx.send(ControlEvent::TrackNow)?;
                    }
                    SignalEvent::RequestRescan => {
                        control_tx.send(ControlEvent::RequestRescan)?;
                    }
                    SignalEvent::Shutdown => {
                        cancel.cancel();
                    }
                }
            }
        }
    }

    Ok(())
}
