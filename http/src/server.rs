//! Serves a pipeline over HTTP/1.

use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use remix_core::Pipeline;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::HttpConfig;
use crate::ingress::BoxError;
use crate::service::PipelineService;

/// Binds `config.addr` and runs `pipeline` for every request until the
/// listener fails.
///
/// # Example
/// ```ignore
/// use remix_http::{HttpConfig, serve};
///
/// #[tokio::main]
/// async fn main() -> Result<(), remix_http::BoxError> {
///     serve(HttpConfig::default(), build_pipeline()).await
/// }
/// ```
pub async fn serve(config: HttpConfig, pipeline: Pipeline) -> Result<(), BoxError> {
    let listener = TcpListener::bind(config.addr).await?;
    serve_listener(listener, config, pipeline).await
}

/// Like [`serve`], on an already bound listener.
pub async fn serve_listener(
    listener: TcpListener,
    config: HttpConfig,
    pipeline: Pipeline,
) -> Result<(), BoxError> {
    tracing::info!(
        addr = %listener.local_addr()?,
        pipeline = %pipeline.name,
        "Server listening"
    );

    let service = PipelineService::from_shared(Arc::new(pipeline), Arc::new(config));

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let service = service.clone();

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                tracing::error!(peer = %peer, "Error serving connection: {:?}", err);
            }
        });
    }
}
