use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use http_body_util::Full;
use remix_core::PipelineError;
use serde_json::json;

use crate::ingress::IngressError;

const GENERIC_MESSAGE: &str = "Internal Server Error";

/// Renders a pipeline error as a JSON response.
///
/// Client errors always carry their message. Server errors only do when
/// `expose_details` is set, so internal wiring problems do not leak.
pub fn error_response(err: &PipelineError, expose_details: bool) -> Response<Full<Bytes>> {
    let message = if err.is_client_error() || expose_details {
        err.to_string()
    } else {
        GENERIC_MESSAGE.to_string()
    };

    json_error(
        err.status_code(),
        json!({
            "error": err.kind(),
            "message": message,
            "stage": err.stage(),
        }),
    )
}

pub(crate) fn ingress_error_response(err: &IngressError) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::BAD_REQUEST);
    json_error(
        status,
        json!({
            "error": "bad_request",
            "message": err.to_string(),
        }),
    )
}

pub(crate) fn not_found(method: &http::Method, path: &str) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::from(format!("Cannot {method} {path}"))));
    *res.status_mut() = StatusCode::NOT_FOUND;
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res
}

fn json_error(status: StatusCode, body: serde_json::Value) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::from(body.to_string())));
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    res
}
