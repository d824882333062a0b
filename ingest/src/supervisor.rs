//! Translation of process termination signals into a shutdown request.
//!
//! The [`Supervisor`] owns the process-wide [`ShutdownTx`]. SIGINT, SIGTERM, or a programmatic
//! [`ShutdownTx::shutdown`] call all resolve the same wait, after which the shutdown routine
//! runs exactly once. Signals received afterwards are logged and ignored.
//!
//! Signal handlers are installed when the supervisor is created, so a signal delivered while
//! the pipeline is still starting is recorded instead of killing the process.

use std::future::Future;
use std::io;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};

/// Blocks the main task until termination is requested.
#[derive(Debug)]
pub struct Supervisor {
    shutdown_tx: ShutdownTx,
    signal_listener: Option<JoinHandle<()>>,
}

impl Supervisor {
    /// Creates a supervisor and installs the SIGINT and SIGTERM handlers.
    ///
    /// Must be called from within a Tokio runtime. Fails when the handlers cannot be
    /// registered.
    pub fn new() -> io::Result<Self> {
        let (shutdown_tx, _) = create_shutdown_channel();

        let signals = TerminationSignals::register()?;
        let signal_listener = tokio::spawn(listen_for_signals(signals, shutdown_tx.clone()));

        Ok(Self {
            shutdown_tx,
            signal_listener: Some(signal_listener),
        })
    }

    /// Creates a supervisor without OS signal handling, leaving [`Supervisor::shutdown_tx`] as
    /// the only trigger.
    pub fn without_os_signals() -> Self {
        let (shutdown_tx, _) = create_shutdown_channel();

        Self {
            shutdown_tx,
            signal_listener: None,
        }
    }

    /// Returns a transmitter that requests shutdown programmatically.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Waits for the first shutdown request and then runs `on_shutdown`.
    ///
    /// Consuming the supervisor guarantees `on_shutdown` runs once. Signals delivered while it
    /// runs are logged and ignored.
    pub async fn supervise<F, Fut, T>(self, on_shutdown: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        shutdown_rx.wait().await;

        info!("shutdown requested, stopping the pipeline");
        let output = on_shutdown().await;

        if let Some(signal_listener) = self.signal_listener {
            signal_listener.abort();
            let _ = signal_listener.await;
        }

        output
    }
}

/// Registered termination signal streams.
#[cfg(unix)]
struct TerminationSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    fn register() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Returns the name of the next received signal, or `None` once both streams closed.
    async fn recv(&mut self) -> Option<&'static str> {
        tokio::select! {
            Some(()) = self.interrupt.recv() => Some("SIGINT"),
            Some(()) = self.terminate.recv() => Some("SIGTERM"),
            else => None,
        }
    }
}

#[cfg(windows)]
struct TerminationSignals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl TerminationSignals {
    fn register() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) -> Option<&'static str> {
        self.ctrl_c.recv().await.map(|()| "CTRL_C")
    }
}

async fn listen_for_signals(mut signals: TerminationSignals, shutdown_tx: ShutdownTx) {
    while let Some(signal_name) = signals.recv().await {
        if shutdown_tx.shutdown() {
            info!(signal = signal_name, "termination signal received");
        } else {
            warn!(signal = signal_name, "shutdown already in progress, ignoring signal");
        }
    }

    warn!("signal streams closed, only programmatic shutdown remains");
}
