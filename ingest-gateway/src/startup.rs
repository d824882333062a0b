use std::io::{self, Write};
use std::net::TcpListener;

use actix_web::dev::{Server, ServerHandle};
use actix_web::web::{self, Data, JsonConfig};
use actix_web::{App, HttpServer};
use actix_web_httpauth::middleware::HttpAuthentication;
use ingest_config::shared::GatewayConfig;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

use crate::authentication::{GatewaySecret, auth_validator};
use crate::routes::{QueueRegistry, health_check, json_error_handler, put, put_many};

/// Number of actix workers serving the gateway.
const GATEWAY_WORKERS: usize = 2;

/// Returns the configured secret, or a generated one printed once to stderr so producers can
/// be configured with it.
pub fn resolve_secret(config: &GatewayConfig) -> GatewaySecret {
    resolve_secret_with(config, &mut io::stderr().lock())
}

/// Like [`resolve_secret`], writing a generated secret to `out` instead of stderr.
///
/// The secret value never reaches the logs.
pub fn resolve_secret_with<W: Write>(config: &GatewayConfig, out: &mut W) -> GatewaySecret {
    if let Some(secret) = &config.secret {
        return GatewaySecret::new(secret.clone());
    }

    let secret = GatewaySecret::generate();
    info!("no gateway secret configured, generated one for this run");
    if let Err(err) = writeln!(out, "gateway secret for this run: {}", secret.expose()) {
        warn!(error = %err, "failed to print the generated gateway secret");
    }

    secret
}

/// HTTP server exposing queues to remote producers.
///
/// The server installs no signal handlers. It runs until [`GatewayHandle::stop`] is called.
pub struct GatewayServer {
    port: u16,
    server: Server,
}

impl GatewayServer {
    /// Binds the configured address and builds the server.
    pub fn build(
        config: &GatewayConfig,
        secret: GatewaySecret,
        registry: QueueRegistry,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(config.address())?;
        let port = listener.local_addr()?.port();

        let secret = Data::new(secret);
        let queues: Vec<String> = registry.names().map(str::to_string).collect();
        let registry = Data::new(registry);

        let server = HttpServer::new(move || {
            let authentication = HttpAuthentication::bearer(auth_validator);
            App::new()
                .wrap(TracingLogger::default())
                .app_data(JsonConfig::default().error_handler(json_error_handler))
                .app_data(secret.clone())
                .app_data(registry.clone())
                .service(health_check)
                .service(
                    web::scope("v1")
                        .wrap(authentication)
                        .service(put)
                        .service(put_many),
                )
        })
        .workers(GATEWAY_WORKERS)
        .disable_signals()
        .listen(listener)?
        .run();

        info!(host = %config.host, port, ?queues, "gateway listening");

        Ok(Self { port, server })
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn handle(&self) -> GatewayHandle {
        GatewayHandle(self.server.handle())
    }

    /// Serves requests until the server is stopped.
    pub async fn run_until_stopped(self) -> io::Result<()> {
        self.server.await
    }
}

/// Handle stopping a running [`GatewayServer`].
#[derive(Clone)]
pub struct GatewayHandle(ServerHandle);

impl GatewayHandle {
    /// Stops accepting connections and waits for in-flight requests to finish.
    pub async fn stop(&self) {
        self.0.stop(true).await;
        info!("gateway stopped");
    }
}
