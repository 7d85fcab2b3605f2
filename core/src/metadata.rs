use crate::deps::Dependencies;
use crate::registry::StageId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Compute,
    Respond,
    RespondIf,
    Validate,
    Promote,
    Import,
    Pipeline,
}

/// Static description of a registered stage, used for introspection and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMetadata {
    pub label: String,
    pub kind: StageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<StageId>,
}

impl StageMetadata {
    pub fn new(label: impl Into<String>, kind: StageKind) -> Self {
        Self {
            label: label.into(),
            kind,
            id: None,
            description: None,
            requires: vec![],
            depends_on: vec![],
        }
    }

    pub fn with_id(mut self, id: StageId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Records the normalized form of `deps`.
    pub fn with_dependencies(mut self, deps: &Dependencies) -> Self {
        let spec = deps.normalize();
        self.requires = spec.requires.unwrap_or_default();
        self.depends_on = spec.depends_on.unwrap_or_default();
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::DependencySpec;
    use serde_json::json;

    #[test]
    fn test_metadata_json() {
        let dep = StageId::from_raw(12);
        let deps = Dependencies::from(DependencySpec::requires(["userId"]).and_depends_on([dep]));
        let meta = StageMetadata::new("load-user", StageKind::Compute)
            .with_id(StageId::from_raw(13))
            .with_dependencies(&deps);

        assert_eq!(
            meta.to_json(),
            json!({
                "label": "load-user",
                "kind": "compute",
                "id": 13,
                "requires": ["userId"],
                "depends_on": [12],
            })
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(json!(StageKind::RespondIf), json!("respond_if"));
    }
}
