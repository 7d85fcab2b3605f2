use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// What a responding stage asks to be sent back.
///
/// A string `body` is written verbatim; any other JSON value is serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Value,
}

impl ResponseDescriptor {
    pub fn new(body: impl Into<Value>) -> Self {
        Self {
            status: None,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Create a JSON response from any serializable body.
    pub fn json<T: Serialize>(body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::to_value(body)?).with_header("content-type", "application/json"))
    }

    /// Create a text/plain response.
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(Value::String(body.into())).with_header("content-type", "text/plain; charset=utf-8")
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Status to write; missing or zero means 200.
    pub fn effective_status(&self) -> u16 {
        match self.status {
            Some(0) | None => 200,
            Some(status) => status,
        }
    }

    pub fn body_bytes(&self) -> Result<Bytes, serde_json::Error> {
        match &self.body {
            Value::String(text) => Ok(Bytes::from(text.clone())),
            other => Ok(Bytes::from(serde_json::to_vec(other)?)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("invalid status code {0}")]
    InvalidStatus(u16),
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
    #[error("body serialization failed: {0}")]
    Body(#[from] serde_json::Error),
}

/// The response half of a request context.
#[derive(Debug, Clone, Default)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), ResponseError> {
        let key = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ResponseError::InvalidHeader(name.to_string()))?;
        let val = HeaderValue::from_str(value)
            .map_err(|_| ResponseError::InvalidHeader(name.to_string()))?;
        self.headers.insert(key, val);
        Ok(())
    }

    /// Writes the final body. The response counts as written from here on.
    pub fn end(&mut self, body: Bytes) {
        self.body = Some(body);
    }

    /// Applies a descriptor: status, every header, then the body.
    ///
    /// Nothing is touched unless the whole descriptor is valid.
    pub fn write(&mut self, descriptor: &ResponseDescriptor) -> Result<(), ResponseError> {
        let code = descriptor.effective_status();
        let status = StatusCode::from_u16(code).map_err(|_| ResponseError::InvalidStatus(code))?;
        let body = descriptor.body_bytes()?;

        let mut headers = self.headers.clone();
        for (name, value) in &descriptor.headers {
            let key = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ResponseError::InvalidHeader(name.clone()))?;
            let val = HeaderValue::from_str(value)
                .map_err(|_| ResponseError::InvalidHeader(name.clone()))?;
            headers.insert(key, val);
        }
        if !headers.contains_key(CONTENT_TYPE) && !descriptor.body.is_string() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        self.status = status;
        self.headers = headers;
        self.end(body);
        Ok(())
    }

    pub fn is_written(&self) -> bool {
        self.body.is_some()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Converts into an `http::Response`; an unwritten body becomes empty.
    pub fn into_response(self) -> Response<Bytes> {
        let mut res = Response::new(self.body.unwrap_or_default());
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_body_is_serialized() {
        let mut writer = ResponseWriter::new();
        writer
            .write(&ResponseDescriptor::new(json!({"ok": true})).with_status(201))
            .unwrap();

        assert!(writer.is_written());
        assert_eq!(writer.status(), StatusCode::CREATED);
        assert_eq!(writer.body().unwrap().as_ref(), br#"{"ok":true}"#);
        assert_eq!(writer.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_string_body_passes_through() {
        let mut writer = ResponseWriter::new();
        writer
            .write(&ResponseDescriptor::new("plain \"text\"").with_header("x-cache", "hit"))
            .unwrap();

        assert_eq!(writer.status(), StatusCode::OK);
        assert_eq!(writer.body().unwrap().as_ref(), b"plain \"text\"");
        assert_eq!(writer.headers()["x-cache"], "hit");
        assert!(writer.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_zero_status_defaults_to_ok() {
        let descriptor = ResponseDescriptor::new(Value::Null).with_status(0);
        assert_eq!(descriptor.effective_status(), 200);
        assert_eq!(descriptor.body_bytes().unwrap().as_ref(), b"null");
    }

    #[test]
    fn test_invalid_descriptor_leaves_writer_untouched() {
        let mut writer = ResponseWriter::new();
        let bad_header = ResponseDescriptor::new("x").with_header("bad header", "v");
        assert!(matches!(
            writer.write(&bad_header),
            Err(ResponseError::InvalidHeader(_))
        ));

        let bad_status = ResponseDescriptor::new("x").with_status(1000);
        assert!(matches!(
            writer.write(&bad_status),
            Err(ResponseError::InvalidStatus(1000))
        ));
        assert!(!writer.is_written());
    }

    #[test]
    fn test_descriptor_from_json() {
        let descriptor: ResponseDescriptor =
            serde_json::from_value(json!({"status": 202, "body": {"queued": 3}})).unwrap();
        assert_eq!(descriptor.effective_status(), 202);
        assert!(descriptor.headers.is_empty());

        let response = {
            let mut writer = ResponseWriter::new();
            writer.write(&descriptor).unwrap();
            writer.into_response()
        };
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.body().as_ref(), br#"{"queued":3}"#);
    }
}
