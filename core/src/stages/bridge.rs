//! Stages that move data between the request and the result table without
//! running a computation.

use crate::context::RequestContext;
use crate::metadata::{StageKind, StageMetadata};
use crate::stage::{Stage, StepResult};
use async_trait::async_trait;
use serde_json::Value;

/// Copies fields of a stored stage result into the request body.
///
/// The source stage is expected to have run already. Fields it did not
/// produce are copied as `null`, which downstream validation treats as
/// missing.
#[derive(Debug, Clone)]
pub struct Promote {
    name: String,
    fields: Vec<String>,
}

impl Promote {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Stage for Promote {
    fn metadata(&self) -> StageMetadata {
        StageMetadata::new(&self.name, StageKind::Promote)
            .with_description(format!("promotes {}", self.fields.join(", ")))
    }

    async fn execute(&self, ctx: &mut RequestContext) -> StepResult {
        let copied: Vec<(String, Value)> = {
            let source = ctx.result(&self.name);
            self.fields
                .iter()
                .map(|field| {
                    let value = source
                        .and_then(|result| result.get(field))
                        .cloned()
                        .unwrap_or(Value::Null);
                    (field.clone(), value)
                })
                .collect()
        };

        ctx.body.extend(copied);
        StepResult::Next
    }
}

/// Copies a host-populated request property wholesale into the result table
/// under the same name.
#[derive(Debug, Clone)]
pub struct Import {
    name: String,
}

impl Import {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Stage for Import {
    fn metadata(&self) -> StageMetadata {
        StageMetadata::new(&self.name, StageKind::Import)
    }

    async fn execute(&self, ctx: &mut RequestContext) -> StepResult {
        let value = ctx.property(&self.name).cloned().unwrap_or(Value::Null);
        ctx.ensure_scratch()
            .results
            .insert(self.name.clone(), value);
        StepResult::Next
    }
}
