use secrecy::SecretString;
use serde::Deserialize;

/// Network endpoint exposing the input queue to external producers.
///
/// This intentionally does not implement [`serde::Serialize`] to avoid leaking the secret.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Whether the gateway is started at all.
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Shared secret producers present as a bearer token. Generated at startup when absent.
    pub secret: Option<SecretString>,
}

impl GatewayConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";

    pub const DEFAULT_PORT: u16 = 50_000;

    /// Returns the `host:port` address the gateway binds to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            secret: None,
        }
    }
}
