//! Dependency declarations and their validation against a merged view.
//!
//! A stage may declare fields it `requires` and computations it `depends_on`.
//! [`Dependencies::normalize`] expands the shorthand forms into one canonical
//! [`DependencySpec`]; [`validate_dependencies`] checks that spec and reports
//! the first unmet constraint.

use crate::error::PipelineError;
use crate::registry::{ExecutionRegistry, StageId};
use crate::view::MergedView;
use serde::Serialize;

/// Canonical dependency shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencySpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<StageId>>,
}

impl DependencySpec {
    pub fn requires<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().and_requires(fields)
    }

    pub fn depends_on<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = StageId>,
    {
        Self::default().and_depends_on(ids)
    }

    pub fn and_requires<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn and_depends_on<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = StageId>,
    {
        self.depends_on = Some(ids.into_iter().collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.requires.is_none() && self.depends_on.is_none()
    }
}

/// What a stage declares at registration time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Dependencies {
    #[default]
    None,
    /// Shorthand for `requires`.
    Fields(Vec<String>),
    Spec(DependencySpec),
}

impl Dependencies {
    pub fn requires<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Dependencies::Fields(fields.into_iter().map(Into::into).collect())
    }

    pub fn depends_on<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = StageId>,
    {
        Dependencies::Spec(DependencySpec::depends_on(ids))
    }

    /// Expands into the canonical shape. Total and pure.
    ///
    /// A field list becomes `requires` unless it is empty; a spec with at
    /// least one key passes through unchanged; everything else is `{}`.
    pub fn normalize(&self) -> DependencySpec {
        match self {
            Dependencies::Fields(fields) if !fields.is_empty() => DependencySpec {
                requires: Some(fields.clone()),
                depends_on: None,
            },
            Dependencies::Spec(spec) if !spec.is_empty() => spec.clone(),
            _ => DependencySpec::default(),
        }
    }
}

impl From<DependencySpec> for Dependencies {
    fn from(spec: DependencySpec) -> Self {
        Dependencies::Spec(spec)
    }
}

impl From<Vec<String>> for Dependencies {
    fn from(fields: Vec<String>) -> Self {
        Dependencies::Fields(fields)
    }
}

impl From<Vec<&str>> for Dependencies {
    fn from(fields: Vec<&str>) -> Self {
        Dependencies::requires(fields)
    }
}

impl<const N: usize> From<[&str; N]> for Dependencies {
    fn from(fields: [&str; N]) -> Self {
        Dependencies::requires(fields)
    }
}

impl From<Option<Dependencies>> for Dependencies {
    fn from(deps: Option<Dependencies>) -> Self {
        deps.unwrap_or_default()
    }
}

/// Required fields that are absent or null, in declaration order.
pub fn missing_requires<'a>(view: &MergedView, requires: &'a [String]) -> Vec<&'a str> {
    requires
        .iter()
        .filter(|field| view.is_missing(field))
        .map(String::as_str)
        .collect()
}

/// Computations that have not run, in declaration order.
pub fn missing_dependencies(executed: &ExecutionRegistry, depends_on: &[StageId]) -> Vec<StageId> {
    depends_on
        .iter()
        .copied()
        .filter(|id| !executed.has_executed(*id))
        .collect()
}

/// Checks `deps` for stage `stage` against `view`.
///
/// An unmet `depends_on` is reported before, and instead of, any missing
/// `requires` field.
pub fn validate_dependencies(
    stage: &str,
    view: &MergedView,
    deps: &Dependencies,
    url: &str,
    method: &str,
) -> Result<(), PipelineError> {
    let spec = deps.normalize();

    if let Some(depends_on) = &spec.depends_on {
        if let Some(dependency) = missing_dependencies(view.executed(), depends_on).first() {
            return Err(PipelineError::DependsOnUnmet {
                stage: stage.to_string(),
                dependency: *dependency,
                url: url.to_string(),
                method: method.to_string(),
            });
        }
    }

    if let Some(requires) = &spec.requires {
        if let Some(field) = missing_requires(view, requires).first() {
            return Err(PipelineError::DependencyUnmet {
                stage: stage.to_string(),
                field: field.to_string(),
                url: url.to_string(),
                method: method.to_string(),
            });
        }
    }

    Ok(())
}
