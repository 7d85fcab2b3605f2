//! # PipelineService - Hyper Service Adapter
//!
//! Runs one [`Pipeline`] per incoming request and turns its outcome into an
//! HTTP response:
//!
//! | Outcome                       | Response                          |
//! |-------------------------------|-----------------------------------|
//! | `Terminate` or body written   | the written response              |
//! | `Next` with nothing written   | 404 `Cannot METHOD path`          |
//! | `Error(e)`                    | JSON error, status `e.status()`   |

use bytes::Bytes;
use http::{Request, Response};
use http_body::Body;
use http_body_util::Full;
use hyper::service::Service;
use remix_core::{Pipeline, Stage, StepResult};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::HttpConfig;
use crate::error::{error_response, ingress_error_response, not_found};
use crate::ingress::{BoxError, into_context};

#[derive(Clone)]
pub struct PipelineService {
    pipeline: Arc<Pipeline>,
    config: Arc<HttpConfig>,
}

impl PipelineService {
    pub fn new(pipeline: Pipeline, config: HttpConfig) -> Self {
        Self::from_shared(Arc::new(pipeline), Arc::new(config))
    }

    pub fn from_shared(pipeline: Arc<Pipeline>, config: Arc<HttpConfig>) -> Self {
        Self { pipeline, config }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Handles a single request end to end.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "HTTPRequest",
            request_id = %request_id,
            method = %req.method(),
            path = %req.uri().path()
        );

        async move {
            let mut ctx = match into_context(req, self.config.max_body_bytes).await {
                Ok(ctx) => ctx,
                Err(e) => {
                    tracing::warn!(error = %e, "Rejected request");
                    return ingress_error_response(&e);
                }
            };

            match self.pipeline.execute(&mut ctx).await {
                StepResult::Error(e) => error_response(&e, self.config.expose_error_details),
                StepResult::Next if !ctx.response.is_written() => {
                    tracing::debug!("Pipeline fell through without a response");
                    not_found(ctx.method(), ctx.path())
                }
                StepResult::Next | StepResult::Terminate => {
                    ctx.response.into_response().map(Full::new)
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl<B> Service<Request<B>> for PipelineService
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
