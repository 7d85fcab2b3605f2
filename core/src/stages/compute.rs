use crate::computation::Computation;
use crate::context::{RequestContext, UNNAMED_STAGE};
use crate::deps::{Dependencies, validate_dependencies};
use crate::error::PipelineError;
use crate::metadata::{StageKind, StageMetadata};
use crate::registry::StageId;
use crate::stage::{Stage, StepResult};
use crate::view::MergedView;
use async_trait::async_trait;
use serde_json::Value;

/// Runs a computation and stores its result under the stage name.
///
/// Results of repeated runs under one name accumulate. Anonymous stages store
/// under [`UNNAMED_STAGE`], which the merged view flattens.
#[derive(Debug, Clone)]
pub struct Compute {
    name: String,
    computation: Computation<Value>,
    deps: Dependencies,
}

impl Compute {
    pub fn named(name: impl Into<String>, computation: Computation<Value>) -> Self {
        Self {
            name: name.into(),
            computation,
            deps: Dependencies::None,
        }
    }

    pub fn anonymous(computation: Computation<Value>) -> Self {
        Self::named(UNNAMED_STAGE, computation)
    }

    pub fn with_dependencies(mut self, deps: impl Into<Dependencies>) -> Self {
        self.deps = deps.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the wrapped computation, for other stages' `depends_on`.
    pub fn id(&self) -> StageId {
        self.computation.id()
    }

    async fn run(&self, ctx: &mut RequestContext) -> Result<(), PipelineError> {
        ctx.ensure_scratch();
        let url = ctx.url().to_string();
        let method = ctx.method().to_string();

        let view = MergedView::from_context(ctx);
        validate_dependencies(&self.name, &view, &self.deps, &url, &method)?;

        let output = self
            .computation
            .call(view)
            .await
            .map_err(|e| PipelineError::computation(&self.name, &url, &method, e))?;

        let fields = match output {
            Value::Object(fields) => Some(fields),
            Value::Null => None,
            other => {
                return Err(PipelineError::InvalidOutput {
                    stage: self.name.clone(),
                    url,
                    method,
                    reason: format!("expected an object result, got {}", json_kind(&other)),
                });
            }
        };

        let scratch = ctx.ensure_scratch();
        scratch.executed.mark(self.computation.id());
        // null stores nothing; an earlier result under the name survives
        if let Some(fields) = fields {
            scratch.store(&self.name, fields);
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for Compute {
    fn metadata(&self) -> StageMetadata {
        StageMetadata::new(&self.name, StageKind::Compute)
            .with_id(self.computation.id())
            .with_dependencies(&self.deps)
    }

    async fn execute(&self, ctx: &mut RequestContext) -> StepResult {
        self.run(ctx).await.into()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Fields;
    use crate::deps::DependencySpec;
    use crate::response::ResponseDescriptor;
    use crate::stages::Respond;
    use http::Method;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_stores_result_and_marks_executed() {
        let stage = Compute::named(
            "greet",
            Computation::from_fn(|_| Ok(json!({"greeting": "hi"}))),
        );
        let mut ctx = RequestContext::new(Method::GET, "/");

        assert!(matches!(stage.execute(&mut ctx).await, StepResult::Next));
        assert_eq!(ctx.result("greet"), Some(&fields(json!({"greeting": "hi"}))));
        assert!(ctx.has_executed(stage.id()));
    }

    #[tokio::test]
    async fn test_repeated_runs_merge() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let stage = Compute::named(
            "acc",
            Computation::from_fn(move |_| {
                Ok(match counter.fetch_add(1, Ordering::SeqCst) {
                    0 => json!({"a": 1}),
                    _ => json!({"b": 2}),
                })
            }),
        );
        let mut ctx = RequestContext::new(Method::GET, "/");

        stage.execute(&mut ctx).await;
        stage.execute(&mut ctx).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.result("acc"), Some(&fields(json!({"a": 1, "b": 2}))));
    }

    #[tokio::test]
    async fn test_anonymous_fields_are_flattened() {
        let stage = Compute::anonymous(Computation::from_fn(|_| Ok(json!({"tenant": "acme"}))));
        let mut ctx = RequestContext::new(Method::GET, "/");
        stage.execute(&mut ctx).await;

        let view = MergedView::from_context(&ctx);
        assert_eq!(view.str("tenant"), Some("acme"));
        assert_eq!(stage.name(), UNNAMED_STAGE);
    }

    #[tokio::test]
    async fn test_computation_sees_prior_results() {
        let first = Compute::named("user", Computation::from_fn(|_| Ok(json!({"id": 7}))));
        let second = Compute::named(
            "orders",
            Computation::from_fn(|view: &MergedView| {
                let id = view.path("user.id").cloned().unwrap_or(Value::Null);
                Ok(json!({"owner": id}))
            }),
        )
        .with_dependencies(DependencySpec::requires(["user"]).and_depends_on([first.id()]));

        let mut ctx = RequestContext::new(Method::GET, "/");
        first.execute(&mut ctx).await;
        assert!(matches!(second.execute(&mut ctx).await, StepResult::Next));
        assert_eq!(ctx.result("orders"), Some(&fields(json!({"owner": 7}))));
    }

    #[tokio::test]
    async fn test_unmet_dependency_skips_computation() {
        let never_run = Computation::<Value>::from_fn(|_| Ok(json!({})));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let stage = Compute::named(
            "test",
            Computation::from_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!({}))
            }),
        )
        .with_dependencies(Dependencies::depends_on([never_run.id()]));

        let mut ctx = RequestContext::new(Method::POST, "/checkout");
        let result = stage.execute(&mut ctx).await;

        match result {
            StepResult::Error(PipelineError::DependsOnUnmet {
                stage,
                dependency,
                url,
                method,
            }) => {
                assert_eq!(stage, "test");
                assert_eq!(dependency, never_run.id());
                assert_eq!(url, "/checkout");
                assert_eq!(method, "POST");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!ctx.has_executed(stage.id()));
    }

    #[tokio::test]
    async fn test_missing_field_is_client_error() {
        let stage = Compute::named("test", Computation::from_fn(|_| Ok(json!({}))))
            .with_dependencies(DependencySpec::requires(["someValue"]));
        let mut ctx = RequestContext::new(Method::GET, "/");

        match stage.execute(&mut ctx).await {
            StepResult::Error(err) => {
                assert_eq!(err.kind(), "dependency_unmet");
                assert_eq!(err.status(), 400);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failing_computation_is_forwarded() {
        let stage = Compute::named(
            "load",
            Computation::<Value>::new(|_| async { Err(anyhow::anyhow!("db unavailable")) }),
        );
        let mut ctx = RequestContext::new(Method::GET, "/");

        match stage.execute(&mut ctx).await {
            StepResult::Error(err) => {
                assert_eq!(err.status(), 500);
                assert!(err.to_string().contains("db unavailable"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(ctx.result("load").is_none());
    }

    #[tokio::test]
    async fn test_non_object_result_rejected() {
        let stage = Compute::named("count", Computation::from_fn(|_| Ok(json!(3))));
        let mut ctx = RequestContext::new(Method::GET, "/");

        match stage.execute(&mut ctx).await {
            StepResult::Error(PipelineError::InvalidOutput { reason, .. }) => {
                assert_eq!(reason, "expected an object result, got a number");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_null_result_only_marks_executed() {
        let audit = Computation::from_fn(|_| Ok(Value::Null));
        let stage = Compute::named("audit", audit.clone());
        let mut ctx = RequestContext::new(Method::GET, "/");

        assert!(matches!(stage.execute(&mut ctx).await, StepResult::Next));
        assert!(ctx.has_executed(stage.id()));
        assert_eq!(ctx.result("audit"), None);

        let needs_field = Respond::new(Computation::from_fn(|_| {
            Ok(ResponseDescriptor::new("audited"))
        }))
        .with_dependencies(["audit"]);
        match needs_field.execute(&mut ctx).await {
            StepResult::Error(PipelineError::DependencyUnmet { field, .. }) => {
                assert_eq!(field, "audit");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!ctx.response.is_written());

        let needs_run = Respond::new(Computation::from_fn(|_| {
            Ok(ResponseDescriptor::new("audited"))
        }))
        .with_dependencies(DependencySpec::depends_on([audit.id()]));
        assert!(matches!(needs_run.execute(&mut ctx).await, StepResult::Terminate));
    }

    #[tokio::test]
    async fn test_null_result_keeps_earlier_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let stage = Compute::named(
            "audit",
            Computation::from_fn(move |_| {
                Ok(match counter.fetch_add(1, Ordering::SeqCst) {
                    0 => json!({"seen": true}),
                    _ => Value::Null,
                })
            }),
        );
        let mut ctx = RequestContext::new(Method::GET, "/");

        stage.execute(&mut ctx).await;
        stage.execute(&mut ctx).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.result("audit"), Some(&fields(json!({"seen": true}))));
    }

    #[tokio::test]
    async fn test_panicking_computation_is_server_error() {
        let stage = Compute::named(
            "fragile",
            Computation::from_fn(|_| -> anyhow::Result<Value> { panic!("index out of bounds") }),
        );
        let mut ctx = RequestContext::new(Method::GET, "/fragile");

        match stage.execute(&mut ctx).await {
            StepResult::Error(err) => {
                assert!(matches!(err, PipelineError::Computation { .. }));
                assert_eq!(err.status(), 500);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!ctx.has_executed(stage.id()));
    }
}
