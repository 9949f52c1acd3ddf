// src/server/handler.rs
use hyper::header::{self, HeaderValue};
use hyper::{Body, Method, Request, Response, StatusCode};
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;

use crate::health::Scheduler;
use crate::metrics::MetricsRegistry;
use crate::status::Status;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub interval_minutes: u64,
    pub apis: BTreeMap<String, Status>,
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to render metrics: {0}")]
    Metrics(#[from] anyhow::Error),
}

impl From<HandlerError> for Response<Body> {
    fn from(err: HandlerError) -> Self {
        let status = match err {
            HandlerError::NotFound => StatusCode::NOT_FOUND,
            HandlerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            HandlerError::Encode(_) | HandlerError::Metrics(_) => {
                tracing::error!(%err, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let mut response = Response::new(Body::from(err.to_string()));
        *response.status_mut() = status;
        response
    }
}

/// Serves the status table, the manual trigger and (optionally) metrics.
#[derive(Clone)]
pub struct RequestHandler {
    scheduler: Arc<Scheduler>,
    metrics: Option<(Arc<MetricsRegistry>, Arc<str>)>,
}

impl RequestHandler {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self {
            scheduler,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, registry: Arc<MetricsRegistry>, path: &str) -> Self {
        self.metrics = Some((registry, Arc::from(path)));
        self
    }

    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, HandlerError> {
        let path = req.uri().path().to_owned();
        let method = req.method().clone();

        if method == Method::OPTIONS {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::NO_CONTENT;
            return Ok(response);
        }

        match path.as_str() {
            "/health" => {
                if method != Method::GET {
                    return Err(HandlerError::MethodNotAllowed);
                }
                self.status_response()
            }
            "/ping" => {
                if method != Method::GET && method != Method::POST {
                    return Err(HandlerError::MethodNotAllowed);
                }
                self.scheduler.trigger_now().await;
                self.status_response()
            }
            _ => match &self.metrics {
                Some((registry, metrics_path)) if path.as_str() == &**metrics_path => {
                    if method != Method::GET {
                        return Err(HandlerError::MethodNotAllowed);
                    }
                    let mut response = Response::new(Body::from(registry.gather()?));
                    response.headers_mut().insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("text/plain; version=0.0.4"),
                    );
                    Ok(response)
                }
                _ => Err(HandlerError::NotFound),
            },
        }
    }

    fn status_response(&self) -> Result<Response<Body>, HandlerError> {
        let body = HealthResponse {
            interval_minutes: self.scheduler.interval().as_secs() / 60,
            apis: self.scheduler.table().snapshot(),
        };

        let mut response = Response::new(Body::from(serde_json::to_vec(&body)?));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(response)
    }
}

fn allow_any_origin(response: &mut Response<Body>) {
    let headers = response.headers_mut();
    let any = HeaderValue::from_static("*");
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, any.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, any.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, any);
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move {
            let mut response = match handler.handle(req).await {
                Ok(response) => response,
                Err(e) => e.into(),
            };
            allow_any_origin(&mut response);
            Ok(response)
        })
    }
}
