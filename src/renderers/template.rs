//! Mustache-based part renderer
//!
//! Useful for parts the composer knows nothing about: the template sees the
//! part JSON under `part` and the context data bag under `data`, e.g.
//! `<bibl>{{part.data.author}}</bibl>`.

use serde::Serialize;
use serde_json::Value;

use crate::context::RenderingContext;
use crate::errors::RenderError;
use crate::flatten::SegmentNode;
use crate::registry::PartRenderer;

#[derive(Serialize)]
struct TemplateData<'a> {
    part: &'a Value,
    data: &'a std::collections::BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// Renders a part through a precompiled mustache template
pub struct TemplatePartRenderer {
    template: mustache::Template,
}

impl std::fmt::Debug for TemplatePartRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplatePartRenderer").finish_non_exhaustive()
    }
}

impl TemplatePartRenderer {
    pub fn new(template: &str) -> Result<Self, RenderError> {
        Ok(Self {
            template: mustache::compile_str(template)?,
        })
    }
}

impl PartRenderer for TemplatePartRenderer {
    fn render(
        &self,
        part: &Value,
        context: &RenderingContext,
        node: Option<&SegmentNode>,
    ) -> Result<String, RenderError> {
        let data = TemplateData {
            part,
            data: context.data(),
            text: node.map(SegmentNode::text),
        };
        Ok(self.template.render_to_string(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenericPart, Item, Part, PartHeader};
    use serde_json::json;

    #[test]
    fn test_renders_part_and_context_data() {
        let renderer = TemplatePartRenderer::new("<bibl n=\"{{data.item_id}}\">{{part.data.author}}</bibl>").unwrap();
        let part = Part::Other(GenericPart::new(PartHeader::new("b", "bibliography"), json!({"author": "Vergil"})));
        let ctx = RenderingContext::new().stage(&Item::new("i9", "Nine")).view;

        let out = renderer.render(&part.to_value().unwrap(), &ctx, None).unwrap();
        assert_eq!(out, "<bibl n=\"i9\">Vergil</bibl>");
    }

    #[test]
    fn test_invalid_template() {
        assert!(matches!(TemplatePartRenderer::new("{{#open}}"), Err(RenderError::Template(_))));
    }
}
