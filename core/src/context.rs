use crate::registry::{ExecutionRegistry, StageId};
use crate::response::ResponseWriter;
use http::Method;
use serde_json::{Map, Value};

/// A JSON object: field name to value.
pub type Fields = Map<String, Value>;

/// Result key shared by all anonymous stages.
pub const UNNAMED_STAGE: &str = "nameless";

/// Storage the stages populate while a request runs.
#[derive(Debug, Clone, Default)]
pub struct Scratch {
    /// Stage name -> last (accumulated) result.
    pub results: Fields,
    pub executed: ExecutionRegistry,
}

impl Scratch {
    /// Merges `fields` into the result already stored under `name`.
    ///
    /// Keys missing from `fields` survive, overlapping keys take the new value.
    /// A previous value that is not an object is replaced.
    pub fn store(&mut self, name: &str, fields: Fields) {
        match self.results.get_mut(name) {
            Some(Value::Object(previous)) => previous.extend(fields),
            _ => {
                self.results.insert(name.to_string(), Value::Object(fields));
            }
        }
    }

    pub fn result(&self, name: &str) -> Option<&Fields> {
        self.results.get(name).and_then(Value::as_object)
    }
}

/// Request context passed through the pipeline.
///
/// Built by the host once per request; stages read the request half and write
/// into the scratch storage and the response.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    url: String,
    path: String,
    pub path_params: Fields,
    pub query: Fields,
    pub body: Fields,
    pub headers: Fields,
    properties: Fields,
    scratch: Option<Scratch>,
    pub response: ResponseWriter,
}

impl RequestContext {
    /// `url` is the original request target, query string included.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let url = url.into();
        let path = url
            .split(|c: char| c == '?' || c == '#')
            .next()
            .filter(|path| !path.is_empty())
            .unwrap_or("/")
            .to_string();

        Self {
            method,
            url,
            path,
            path_params: Fields::new(),
            query: Fields::new(),
            body: Fields::new(),
            headers: Fields::new(),
            properties: Fields::new(),
            scratch: None,
            response: ResponseWriter::new(),
        }
    }

    pub fn with_path_params(mut self, params: Fields) -> Self {
        self.path_params = params;
        self
    }

    pub fn with_query(mut self, query: Fields) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Fields) -> Self {
        self.body = body;
        self
    }

    /// Header names are stored lower-cased.
    pub fn with_header(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// A property populated by a collaborator outside the stage protocol.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: Value) {
        self.properties.insert(name.into(), value);
    }

    /// Creates the scratch storage on first use. Idempotent.
    pub fn ensure_scratch(&mut self) -> &mut Scratch {
        self.scratch.get_or_insert_with(Scratch::default)
    }

    pub fn scratch(&self) -> Option<&Scratch> {
        self.scratch.as_ref()
    }

    pub fn result(&self, name: &str) -> Option<&Fields> {
        self.scratch.as_ref().and_then(|scratch| scratch.result(name))
    }

    pub fn has_executed(&self, id: StageId) -> bool {
        self.scratch
            .as_ref()
            .is_some_and(|scratch| scratch.executed.has_executed(id))
    }
}
