//! Renderer registry and dispatch
//!
//! Renderers are bound to a part type plus an optional role. Lookup tries the
//! exact (type, role) key first and falls back to the type alone, so one
//! renderer can serve every role of a type unless a role-specific one exists.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::context::RenderingContext;
use crate::errors::RenderError;
use crate::flatten::SegmentNode;
use crate::model::PartHeader;

/// Registry key: part type plus role (`None` is the base role)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartKey {
    pub type_id: String,
    pub role_id: Option<String>,
}

impl PartKey {
    pub fn new(type_id: impl Into<String>, role_id: Option<&str>) -> Self {
        Self {
            type_id: type_id.into(),
            role_id: role_id.map(str::to_string),
        }
    }

    pub fn of(header: &PartHeader) -> Self {
        Self::new(header.type_id.clone(), header.role_id.as_deref())
    }

    /// Same type, base role
    pub fn base(&self) -> Self {
        Self {
            type_id: self.type_id.clone(),
            role_id: None,
        }
    }
}

impl fmt::Display for PartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.role_id {
            Some(role) => write!(f, "{}:{}", self.type_id, role),
            None => write!(f, "{}", self.type_id),
        }
    }
}

/// Pluggable part renderer
///
/// `part` is the part's JSON form. `node` is the segment tree root for the
/// base text part and `None` for every other part.
pub trait PartRenderer: Send + Sync {
    fn render(
        &self,
        part: &Value,
        context: &RenderingContext,
        node: Option<&SegmentNode>,
    ) -> Result<String, RenderError>;
}

impl<F> PartRenderer for F
where
    F: Fn(&Value, &RenderingContext, Option<&SegmentNode>) -> Result<String, RenderError> + Send + Sync,
{
    fn render(
        &self,
        part: &Value,
        context: &RenderingContext,
        node: Option<&SegmentNode>,
    ) -> Result<String, RenderError> {
        self(part, context, node)
    }
}

/// Type/role → renderer bindings, filled before a run starts
#[derive(Clone, Default)]
pub struct RendererRegistry {
    renderers: HashMap<PartKey, Arc<dyn PartRenderer>>,
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.renderers.keys().map(ToString::to_string).collect();
        keys.sort();
        f.debug_struct("RendererRegistry").field("keys", &keys).finish()
    }
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a renderer, replacing any previous one for the same key
    pub fn register<R>(&mut self, type_id: &str, role_id: Option<&str>, renderer: R)
    where
        R: PartRenderer + 'static,
    {
        self.renderers.insert(PartKey::new(type_id, role_id), Arc::new(renderer));
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<R>(mut self, type_id: &str, role_id: Option<&str>, renderer: R) -> Self
    where
        R: PartRenderer + 'static,
    {
        self.register(type_id, role_id, renderer);
        self
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    /// Renderer for a part: exact key, then type-only fallback
    pub fn resolve(&self, header: &PartHeader) -> Option<Arc<dyn PartRenderer>> {
        let key = PartKey::of(header);
        self.renderers
            .get(&key)
            .or_else(|| self.renderers.get(&key.base()))
            .cloned()
    }

    pub fn contains(&self, header: &PartHeader) -> bool {
        self.resolve(header).is_some()
    }
}
