//! Composer settings
//!
//! Plain data, usually parsed from YAML or JSON by the host. Wrapper
//! templates are mustache strings; `flowTemplates` overrides the default
//! head/tail for a given flow.
//!
//! ```yaml
//! head: "<TEI n=\"{{group_id}}\">"
//! tail: "</TEI>"
//! flowNames:
//!   text: text
//!   "layer:fr.apparatus": app
//! flowTemplates:
//!   app:
//!     head: "<listApp>"
//!     tail: "</listApp>"
//! data:
//!   edition: "Aeneid"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::SettingsError;
use crate::registry::PartKey;

/// Head/tail wrapper pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapTemplates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail: Option<String>,
}

impl WrapTemplates {
    pub fn new(head: Option<&str>, tail: Option<&str>) -> Self {
        Self {
            head: head.map(str::to_string),
            tail: tail.map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none() && self.tail.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposerSettings {
    /// Default group head, filled with the incoming item's data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,

    /// Default group tail, filled with the outgoing item's data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail: Option<String>,

    /// Per-flow overrides of head/tail
    pub flow_templates: BTreeMap<String, WrapTemplates>,

    /// Part key (`type` or `type:role`) → flow name
    pub flow_names: BTreeMap<String, String>,

    /// Global template values, available to every item
    pub data: BTreeMap<String, String>,
}

impl ComposerSettings {
    pub fn builder() -> ComposerSettingsBuilder {
        ComposerSettingsBuilder::default()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SettingsError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Flow receiving the output of parts with this key
    pub fn flow_name(&self, key: &PartKey) -> String {
        let full = key.to_string();
        self.flow_names
            .get(&full)
            .or_else(|| self.flow_names.get(&key.type_id))
            .cloned()
            .unwrap_or(full)
    }

    /// Effective wrapper templates of a flow
    pub fn wrap_for(&self, flow: &str) -> WrapTemplates {
        let own = self.flow_templates.get(flow);
        WrapTemplates {
            head: own.and_then(|t| t.head.clone()).or_else(|| self.head.clone()),
            tail: own.and_then(|t| t.tail.clone()).or_else(|| self.tail.clone()),
        }
    }
}

/// Fluent builder for [`ComposerSettings`]
#[derive(Debug, Default)]
pub struct ComposerSettingsBuilder {
    settings: ComposerSettings,
}

impl ComposerSettingsBuilder {
    pub fn head<S: Into<String>>(mut self, head: S) -> Self {
        self.settings.head = Some(head.into());
        self
    }

    pub fn tail<S: Into<String>>(mut self, tail: S) -> Self {
        self.settings.tail = Some(tail.into());
        self
    }

    pub fn flow_templates(mut self, flow: &str, templates: WrapTemplates) -> Self {
        self.settings.flow_templates.insert(flow.to_string(), templates);
        self
    }

    /// Route parts with `key` (`type` or `type:role`) to `flow`
    pub fn flow_name(mut self, key: &str, flow: &str) -> Self {
        self.settings.flow_names.insert(key.to_string(), flow.to_string());
        self
    }

    pub fn data<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.settings.data.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> ComposerSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_settings() {
        let settings = ComposerSettings::from_yaml_str(
            r#"
head: "<TEI n=\"{{group_id}}\">"
tail: "</TEI>"
flowNames:
  "layer:fr.apparatus": app
flowTemplates:
  app:
    head: "<listApp>"
data:
  edition: Aeneid
"#,
        )
        .unwrap();

        assert_eq!(settings.tail.as_deref(), Some("</TEI>"));
        assert_eq!(settings.flow_name(&PartKey::new("layer", Some("fr.apparatus"))), "app");
        assert_eq!(settings.flow_name(&PartKey::new("layer", Some("fr.comment"))), "layer:fr.comment");
        assert_eq!(settings.data["edition"], "Aeneid");

        let app = settings.wrap_for("app");
        assert_eq!(app.head.as_deref(), Some("<listApp>"));
        assert_eq!(app.tail.as_deref(), Some("</TEI>"));
    }

    #[test]
    fn test_type_level_flow_name() {
        let settings = ComposerSettings::builder().flow_name("text", "body").build();
        assert_eq!(settings.flow_name(&PartKey::new("text", Some("base"))), "body");
    }

    #[test]
    fn test_invalid_json_settings() {
        assert!(matches!(
            ComposerSettings::from_json_str("{\"head\": 3"),
            Err(SettingsError::Json(_))
        ));
    }
}
