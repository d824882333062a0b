use ingest::types::Post;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::routes::{EnqueueResponse, ErrorMessage};

/// Errors returned by the [`GatewayClient`].
#[derive(Debug, Error)]
pub enum GatewayClientError {
    #[error("the gateway rejected the secret")]
    Unauthorized,

    #[error("the queue `{0}` is closed to new writes")]
    QueueClosed(String),

    #[error("the queue `{0}` does not exist")]
    UnknownQueue(String),

    #[error("the gateway rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("http request to the gateway failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Producer-side client of the Remote Queue Gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    secret: SecretString,
    http: reqwest::Client,
}

impl GatewayClient {
    /// Creates a client for the gateway at `address` (`host:port`).
    pub fn new(address: &str, secret: SecretString) -> Self {
        Self {
            base_url: format!("http://{address}"),
            secret,
            http: reqwest::Client::new(),
        }
    }

    /// Enqueues `post` on `queue`.
    pub async fn put(&self, queue: &str, post: &Post) -> Result<usize, GatewayClientError> {
        let request = self
            .http
            .post(format!("{}/v1/queues/{queue}/put", self.base_url))
            .json(post);

        self.enqueue(queue, request).await
    }

    /// Enqueues every post of `posts` on `queue`, returning how many were enqueued.
    pub async fn put_many(&self, queue: &str, posts: &[Post]) -> Result<usize, GatewayClientError> {
        let request = self
            .http
            .post(format!("{}/v1/queues/{queue}/put_many", self.base_url))
            .json(posts);

        self.enqueue(queue, request).await
    }

    /// Checks that the gateway is up. Doesn't require the secret.
    pub async fn health_check(&self) -> Result<(), GatewayClientError> {
        let response = self
            .http
            .get(format!("{}/health_check", self.base_url))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(rejected(response).await)
    }

    async fn enqueue(
        &self,
        queue: &str,
        request: RequestBuilder,
    ) -> Result<usize, GatewayClientError> {
        let response = request
            .bearer_auth(self.secret.expose_secret())
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body: EnqueueResponse = response.json().await?;
                Ok(body.enqueued)
            }
            StatusCode::UNAUTHORIZED => Err(GatewayClientError::Unauthorized),
            StatusCode::NOT_FOUND => Err(GatewayClientError::UnknownQueue(queue.to_string())),
            StatusCode::SERVICE_UNAVAILABLE => {
                Err(GatewayClientError::QueueClosed(queue.to_string()))
            }
            _ => Err(rejected(response).await),
        }
    }
}

async fn rejected(response: Response) -> GatewayClientError {
    let status = response.status().as_u16();
    let message = match response.text().await {
        Ok(body) => serde_json::from_str::<ErrorMessage>(&body)
            .map(|message| message.error)
            .unwrap_or(body),
        Err(err) => return GatewayClientError::Http(err),
    };

    GatewayClientError::Rejected { status, message }
}
