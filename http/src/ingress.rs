//! # Ingress: HTTP request -> RequestContext
//!
//! Decodes the parts of an `http::Request` the pipeline reads: query string,
//! body, headers. Path parameters and extra request properties are not
//! derived here; an upstream router or middleware puts them into the request
//! extensions as [`PathParams`] and [`RequestProperties`].

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Request};
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use remix_core::{Fields, RequestContext};
use serde_json::Value;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Path parameters captured by the router in front of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PathParams(pub Fields);

/// Request properties populated outside the stage protocol, readable by
/// `import` stages.
#[derive(Debug, Clone, Default)]
pub struct RequestProperties(pub Fields);

#[derive(Error, Debug)]
pub enum IngressError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("failed to read request body: {0}")]
    Body(BoxError),
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),
    #[error("JSON body must be an object")]
    NotAnObject,
    #[error("invalid query string: {0}")]
    Query(serde_urlencoded::de::Error),
}

impl IngressError {
    pub fn status(&self) -> u16 {
        match self {
            IngressError::TooLarge { .. } => 413,
            _ => 400,
        }
    }
}

/// Reads the whole request into a fresh context.
pub async fn into_context<B>(req: Request<B>, max_body_bytes: usize) -> Result<RequestContext, IngressError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let (parts, body) = req.into_parts();

    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.to_string());

    let query = match parts.uri.query() {
        Some(raw) => parse_query(raw)?,
        None => Fields::new(),
    };

    let bytes = Limited::new(body, max_body_bytes)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                IngressError::TooLarge {
                    limit: max_body_bytes,
                }
            } else {
                IngressError::Body(e)
            }
        })?
        .to_bytes();

    let body = parse_body(&parts.headers, &bytes)?;

    let mut ctx = RequestContext::new(parts.method.clone(), url)
        .with_query(query)
        .with_body(body);
    ctx.headers = header_fields(&parts.headers);

    if let Some(PathParams(params)) = parts.extensions.get::<PathParams>() {
        ctx.path_params = params.clone();
    }
    if let Some(RequestProperties(props)) = parts.extensions.get::<RequestProperties>() {
        for (name, value) in props {
            ctx.set_property(name.clone(), value.clone());
        }
    }

    Ok(ctx)
}

/// Repeated keys collect into an array, in order of appearance.
fn parse_query(raw: &str) -> Result<Fields, IngressError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).map_err(IngressError::Query)?;
    Ok(collect_pairs(pairs))
}

fn collect_pairs(pairs: Vec<(String, String)>) -> Fields {
    let mut fields = Fields::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match fields.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                fields.insert(key, value);
            }
        }
    }
    fields
}

fn parse_body(headers: &HeaderMap, bytes: &Bytes) -> Result<Fields, IngressError> {
    if bytes.is_empty() {
        return Ok(Fields::new());
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") || content_type.ends_with("+json") {
        match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(fields) => Ok(fields),
            _ => Err(IngressError::NotAnObject),
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)?;
        Ok(collect_pairs(pairs))
    } else {
        Ok(Fields::new())
    }
}

/// Multi-valued headers are joined with `", "`. Values that are not valid
/// UTF-8 are dropped, and a header left with no value is skipped.
fn header_fields(headers: &HeaderMap) -> Fields {
    let mut fields = Fields::new();
    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        if values.is_empty() {
            continue;
        }
        fields.insert(name.as_str().to_string(), Value::String(values.join(", ")));
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use http_body_util::Full;
    use serde_json::json;

    fn request(method: Method, uri: &str, content_type: Option<&str>, body: &str) -> Request<Full<Bytes>> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(Full::new(Bytes::from(body.to_string()))).unwrap()
    }

    #[tokio::test]
    async fn test_json_request() {
        let req = request(
            Method::POST,
            "/users?page=2&tag=a&tag=b",
            Some("application/json"),
            r#"{"name": "ada", "age": 36}"#,
        );
        let ctx = into_context(req, 1024).await.unwrap();

        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.url(), "/users?page=2&tag=a&tag=b");
        assert_eq!(ctx.path(), "/users");
        assert_eq!(ctx.query.get("page"), Some(&json!("2")));
        assert_eq!(ctx.query.get("tag"), Some(&json!(["a", "b"])));
        assert_eq!(ctx.body.get("age"), Some(&json!(36)));
        assert_eq!(ctx.headers.get("content-type"), Some(&json!("application/json")));
    }

    #[tokio::test]
    async fn test_form_request() {
        let req = request(
            Method::POST,
            "/login",
            Some("application/x-www-form-urlencoded"),
            "user=ada&remember=on",
        );
        let ctx = into_context(req, 1024).await.unwrap();
        assert_eq!(ctx.body.get("user"), Some(&json!("ada")));
        assert_eq!(ctx.body.get("remember"), Some(&json!("on")));
    }

    #[tokio::test]
    async fn test_unknown_content_type_ignored() {
        let req = request(Method::PUT, "/blob", Some("application/octet-stream"), "raw");
        let ctx = into_context(req, 1024).await.unwrap();
        assert!(ctx.body.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_bad_bodies() {
        let array = request(Method::POST, "/", Some("application/json"), "[1, 2]");
        assert!(matches!(
            into_context(array, 1024).await,
            Err(IngressError::NotAnObject)
        ));

        let broken = request(Method::POST, "/", Some("application/json"), "{");
        let err = into_context(broken, 1024).await.unwrap_err();
        assert!(matches!(err, IngressError::Json(_)));
        assert_eq!(err.status(), 400);

        let large = request(Method::POST, "/", Some("application/json"), r#"{"k": "0123456789"}"#);
        let err = into_context(large, 8).await.unwrap_err();
        assert!(matches!(err, IngressError::TooLarge { limit: 8 }));
        assert_eq!(err.status(), 413);
    }

    #[tokio::test]
    async fn test_extensions_are_bridged() {
        let mut req = request(Method::GET, "/users/7", None, "");
        req.extensions_mut()
            .insert(PathParams(json!({"id": "7"}).as_object().cloned().unwrap_or_default()));
        req.extensions_mut().insert(RequestProperties(
            json!({"session": {"user": "ana"}}).as_object().cloned().unwrap_or_default(),
        ));

        let ctx = into_context(req, 1024).await.unwrap();
        assert_eq!(ctx.path_params.get("id"), Some(&json!("7")));
        assert_eq!(ctx.property("session"), Some(&json!({"user": "ana"})));
    }

    #[test]
    fn test_multi_valued_headers_joined() {
        let mut headers = HeaderMap::new();
        headers.append("accept", "text/html".parse().unwrap());
        headers.append("accept", "application/json".parse().unwrap());

        let fields = header_fields(&headers);
        assert_eq!(fields.get("accept"), Some(&json!("text/html, application/json")));
    }

    #[test]
    fn test_non_utf8_headers_skipped() {
        let mut headers = HeaderMap::new();
        headers.append("x-raw", http::HeaderValue::from_bytes(b"\xff\xfe").unwrap());
        headers.append("x-mixed", http::HeaderValue::from_bytes(b"\xff").unwrap());
        headers.append("x-mixed", "ok".parse().unwrap());

        let fields = header_fields(&headers);
        assert!(!fields.contains_key("x-raw"));
        assert_eq!(fields.get("x-mixed"), Some(&json!("ok")));
    }
}
