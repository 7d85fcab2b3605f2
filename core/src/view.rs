//! # Merged View: the per-invocation lookup table
//!
//! Every stage sees one flat map built from everything known about the
//! request so far. Sources are overlaid in a fixed order, later ones winning
//! on key collisions:
//!
//! 1. path params
//! 2. query params
//! 3. body fields
//! 4. stage results, each nested under its stage name
//! 5. fields of the anonymous stages, flattened
//! 6. request metadata: `url`, `method`, `path`
//! 7. headers
//!
//! The execution registry travels next to the map, keyed by [`StageId`].

use crate::context::{Fields, RequestContext, UNNAMED_STAGE};
use crate::registry::{ExecutionRegistry, StageId};
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct MergedView {
    fields: Fields,
    executed: ExecutionRegistry,
}

impl MergedView {
    /// Aggregates the context. Never mutates it; missing scratch storage reads
    /// as empty.
    pub fn from_context(ctx: &RequestContext) -> Self {
        let mut fields = Fields::new();

        overlay(&mut fields, &ctx.path_params);
        overlay(&mut fields, &ctx.query);
        overlay(&mut fields, &ctx.body);

        if let Some(scratch) = ctx.scratch() {
            overlay(&mut fields, &scratch.results);
            if let Some(unnamed) = scratch.result(UNNAMED_STAGE) {
                overlay(&mut fields, unnamed);
            }
        }

        fields.insert("url".into(), Value::String(ctx.url().to_string()));
        fields.insert("method".into(), Value::String(ctx.method().to_string()));
        fields.insert("path".into(), Value::String(ctx.path().to_string()));

        overlay(&mut fields, &ctx.headers);

        let executed = ctx
            .scratch()
            .map(|scratch| scratch.executed.clone())
            .unwrap_or_default();

        Self { fields, executed }
    }

    /// Builds a view straight from fields, without a request behind it.
    pub fn from_fields(fields: Fields) -> Self {
        Self {
            fields,
            executed: ExecutionRegistry::new(),
        }
    }

    pub fn with_executed(mut self, id: StageId) -> Self {
        self.executed.mark(id);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Deserializes a field, `None` when it is absent or has another shape.
    pub fn get_as<T: DeserializeOwned>(&self, field: &str) -> Option<T> {
        self.get(field)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Follows a dotted path into nested objects, e.g. `"user.address.city"`.
    pub fn path(&self, dotted: &str) -> Option<&Value> {
        let mut segments = dotted.split('.');
        let first = self.fields.get(segments.next()?)?;
        segments.try_fold(first, |value, segment| value.get(segment))
    }

    /// Absent and `null` are missing; `0`, `""`, `false` and empty
    /// containers are present.
    pub fn is_missing(&self, field: &str) -> bool {
        matches!(self.get(field), None | Some(Value::Null))
    }

    pub fn has_executed(&self, id: StageId) -> bool {
        self.executed.has_executed(id)
    }

    pub fn url(&self) -> &str {
        self.str("url").unwrap_or_default()
    }

    pub fn method(&self) -> &str {
        self.str("method").unwrap_or_default()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn executed(&self) -> &ExecutionRegistry {
        &self.executed
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }
}

fn overlay(target: &mut Fields, source: &Fields) {
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}
