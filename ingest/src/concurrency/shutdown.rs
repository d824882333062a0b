//! Broadcast shutdown signalling.
//!
//! A single [`ShutdownTx`] notifies every subscribed [`ShutdownRx`] that a termination request
//! was issued. The request is level-triggered: receivers that subscribe after the request still
//! observe it, and repeated requests are no-ops.

use tokio::sync::watch;

/// Transmitter side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

impl ShutdownTx {
    /// Requests shutdown of every subscriber.
    ///
    /// Returns `true` if this call issued the request and `false` if shutdown had already been
    /// requested.
    pub fn shutdown(&self) -> bool {
        !self.0.send_replace(true)
    }

    /// Returns `true` once shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Creates a new receiver for this channel.
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }
}

/// Receiver side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

impl ShutdownRx {
    /// Returns `true` once shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Waits until shutdown is requested.
    ///
    /// Resolves immediately if the request was already issued. A dropped transmitter is treated
    /// as a shutdown request, since nobody is left to keep the subscriber running.
    pub async fn wait(&mut self) {
        let _ = self.0.wait_for(|requested| *requested).await;
    }
}

/// Creates a new shutdown channel in the "running" state.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), ShutdownRx(rx))
}
