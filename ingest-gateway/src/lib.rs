//! Remote Queue Gateway.
//!
//! Exposes named input queues over an authenticated HTTP endpoint so producers outside the
//! daemon can enqueue posts, and provides the [`client::GatewayClient`] those producers use.

pub mod authentication;
pub mod client;
pub mod routes;
pub mod startup;
