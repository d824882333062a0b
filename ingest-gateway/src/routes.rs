use std::collections::HashMap;
use std::sync::Arc;

use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::web::{Data, Json, Path};
use actix_web::{HttpRequest, HttpResponse, Responder, ResponseError, get, post};
use ingest::concurrency::queue::DrainableQueue;
use ingest::error::{ErrorKind, IngestError};
use ingest::types::Post;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Queues reachable through the gateway, by name.
#[derive(Debug, Clone, Default)]
pub struct QueueRegistry {
    queues: HashMap<String, Arc<DrainableQueue<Post>>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `queue` under its own name.
    pub fn with_queue(mut self, queue: Arc<DrainableQueue<Post>>) -> Self {
        self.queues.insert(queue.name().to_string(), queue);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<DrainableQueue<Post>>> {
        self.queues.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queues.keys().map(String::as_str)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub enqueued: usize,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("The queue `{0}` does not exist")]
    UnknownQueue(String),

    #[error("The queue `{0}` is closed to new writes")]
    QueueClosed(String),

    #[error("The request body is invalid: {0}")]
    MalformedBody(String),

    #[error("The queue `{queue}` rejected the write")]
    Queue { queue: String, source: IngestError },
}

impl GatewayError {
    fn from_queue(queue: &str, err: IngestError) -> Self {
        match err.kind() {
            ErrorKind::QueueClosed => GatewayError::QueueClosed(queue.to_string()),
            _ => GatewayError::Queue {
                queue: queue.to_string(),
                source: err,
            },
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UnknownQueue(_) => StatusCode::NOT_FOUND,
            GatewayError::QueueClosed(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::Queue { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorMessage {
            error: self.to_string(),
        })
    }
}

/// Turns JSON extraction failures into [`GatewayError::MalformedBody`].
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    GatewayError::MalformedBody(err.to_string()).into()
}

fn lookup<'a>(
    registry: &'a QueueRegistry,
    name: &str,
) -> Result<&'a Arc<DrainableQueue<Post>>, GatewayError> {
    registry
        .get(name)
        .ok_or_else(|| GatewayError::UnknownQueue(name.to_string()))
}

#[get("/health_check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

#[post("/queues/{name}/put")]
pub async fn put(
    registry: Data<QueueRegistry>,
    name: Path<String>,
    post: Json<Post>,
) -> Result<impl Responder, GatewayError> {
    let name = name.into_inner();
    let queue = lookup(&registry, &name)?;

    queue
        .put(post.into_inner())
        .await
        .map_err(|err| GatewayError::from_queue(&name, err))?;

    debug!(queue = %name, "enqueued post");

    Ok(Json(EnqueueResponse { enqueued: 1 }))
}

#[post("/queues/{name}/put_many")]
pub async fn put_many(
    registry: Data<QueueRegistry>,
    name: Path<String>,
    posts: Json<Vec<Post>>,
) -> Result<impl Responder, GatewayError> {
    let name = name.into_inner();
    let queue = lookup(&registry, &name)?;

    let enqueued = queue
        .put_many(posts.into_inner())
        .await
        .map_err(|err| GatewayError::from_queue(&name, err))?;

    debug!(queue = %name, enqueued, "enqueued posts");

    Ok(Json(EnqueueResponse { enqueued }))
}
