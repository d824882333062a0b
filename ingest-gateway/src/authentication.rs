use actix_web::dev::ServiceRequest;
use actix_web::error::ErrorUnauthorized;
use actix_web::web::Data;
use actix_web_httpauth::extractors::bearer::BearerAuth;
use base64::Engine;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use constant_time_eq::constant_time_eq;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

/// Number of random bytes of a generated secret.
const GENERATED_SECRET_LEN: usize = 32;

/// Shared secret every producer presents as a bearer token.
#[derive(Debug, Clone)]
pub struct GatewaySecret(SecretString);

impl GatewaySecret {
    pub fn new(secret: SecretString) -> Self {
        Self(secret)
    }

    /// Generates a random secret, URL-safe base64 encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; GENERATED_SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);

        Self(SecretString::new(BASE64_URL_SAFE_NO_PAD.encode(bytes)))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Compares `token` with the secret in constant time.
    pub fn matches(&self, token: &str) -> bool {
        constant_time_eq(token.as_bytes(), self.expose().as_bytes())
    }
}

/// Bearer validator rejecting every request that doesn't present the gateway secret.
///
/// Requests without an `Authorization` header are rejected by the middleware before this runs.
pub async fn auth_validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (actix_web::Error, ServiceRequest)> {
    let authorized = req
        .app_data::<Data<GatewaySecret>>()
        .is_some_and(|secret| secret.matches(credentials.token()));

    if !authorized {
        warn!(path = %req.path(), "rejected request with an invalid gateway secret");
        return Err((ErrorUnauthorized("invalid gateway secret"), req));
    }

    Ok(req)
}
