//! Item composer
//!
//! Owns the open/compose/close lifecycle of a run. For each item:
//!
//! 1. Resolve a renderer for every part (fails fast on unbound parts)
//! 2. Handle the group transition against the previous item
//! 3. Render every non-text part into the data bag
//! 4. Flatten the base text with all layers into a segment tree
//! 5. Render the text part over the tree
//! 6. Route text and layer output into their flows
//!
//! Everything happens on a staged copy of the context, committed only when
//! the whole item succeeded.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::context::{keys, RenderingContext};
use crate::errors::{ComposeError, RenderError};
use crate::flatten::flatten;
use crate::group::{ByGroupId, ItemGrouper};
use crate::model::{Item, LayerPart, Part, PartHeader, TextPart};
use crate::registry::{PartKey, PartRenderer, RendererRegistry};
use crate::settings::ComposerSettings;
use crate::tree::TreeRenderer;

pub struct Composer {
    registry: RendererRegistry,
    settings: ComposerSettings,
    grouper: Box<dyn ItemGrouper>,
    context: RenderingContext,
    open: bool,
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl Composer {
    pub fn new(registry: RendererRegistry, settings: ComposerSettings) -> Self {
        let context = RenderingContext::with_globals(settings.data.clone());
        Self {
            registry,
            settings,
            grouper: Box::new(ByGroupId),
            context,
            open: false,
        }
    }

    /// Replace the hook deciding which group an item belongs to
    pub fn with_grouper<G: ItemGrouper + 'static>(mut self, grouper: G) -> Self {
        self.grouper = Box::new(grouper);
        self
    }

    pub fn settings(&self) -> &ComposerSettings {
        &self.settings
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Start a run: group state and flows are reset
    pub fn open(&mut self) {
        debug!("composer open");
        self.context.reset();
        self.open = true;
    }

    /// Compose one item into the flows
    ///
    /// On error the flows, data and group state are left as they were before
    /// the call.
    pub fn compose(&mut self, item: &Item) -> Result<(), ComposeError> {
        if !self.open {
            return Err(ComposeError::NotOpen);
        }
        debug!("composing item {} ({} parts)", item.id, item.parts.len());

        let resolved = self.resolve_renderers(item)?;
        let tree_renderer = TreeRenderer::new(&self.settings);

        let mut staged = self.context.stage(item);
        tree_renderer.begin_item(&self.context, &mut staged, self.grouper.group_id(item))?;

        // Parts not bound to the tree
        for (part, renderer) in &resolved {
            if matches!(part, Part::Text(_)) {
                continue;
            }
            trace!("item {}: rendering part {} ({})", item.id, part.id(), PartKey::of(part.header()));
            let value = part.to_value().map_err(|e| render_error(item, part, e.into()))?;
            let output = renderer
                .render(&value, &staged.view, None)
                .map_err(|e| render_error(item, part, e))?;
            staged.view.set(part.id(), output);
        }

        // Base text over the segment tree; extra text parts are ignored
        let layers: Vec<&LayerPart> = item.layer_parts().collect();
        let text_id = match item.text_part() {
            Some(text) => {
                let tree = flatten(text, &layers)
                    .map_err(|e| ComposeError::from_span(&item.id, &e.part_id, e.source))?;
                trace!("item {}: {} segments", item.id, tree.segments.len());

                let part = resolved
                    .iter()
                    .find(|(p, _)| p.id() == text.header.id)
                    .map(|(p, r)| (*p, Arc::clone(r)));
                if let Some((part, renderer)) = part {
                    let value = part.to_value().map_err(|e| render_error(item, part, e.into()))?;
                    let output = renderer
                        .render(&value, &staged.view, Some(&tree.root))
                        .map_err(|e| render_error(item, part, e))?;
                    staged.view.set(part.id(), output);
                }
                Some(text.header.id.clone())
            }
            None => {
                // Without a base text every fragment location is out of range
                if !layers.is_empty() {
                    flatten(&TextPart::new(PartHeader::default()), &layers)
                        .map_err(|e| ComposeError::from_span(&item.id, &e.part_id, e.source))?;
                }
                None
            }
        };

        for (part, _) in &resolved {
            if !part.is_flattened() {
                continue;
            }
            if let Part::Text(text) = part {
                if text_id.as_ref() != Some(&text.header.id) {
                    warn!("item {}: ignoring extra text part {}", item.id, part.id());
                    continue;
                }
            }

            let flow = self.settings.flow_name(&PartKey::of(part.header()));
            let content = staged.view.get(part.id()).unwrap_or_default().to_string();
            tree_renderer.route(&mut staged, &flow, &content)?;
        }

        self.context.commit(staged);
        Ok(())
    }

    /// Close the run, emitting the tail of the last open group
    pub fn close(&mut self) -> Result<(), ComposeError> {
        if !self.open {
            return Err(ComposeError::NotOpen);
        }
        TreeRenderer::new(&self.settings).close(&mut self.context)?;
        self.open = false;
        debug!("composer closed with {} flow(s)", self.context.flows().len());
        Ok(())
    }

    /// Flow name → accumulated text
    pub fn flows(&self) -> &BTreeMap<String, String> {
        self.context.flows()
    }

    pub fn context(&self) -> &RenderingContext {
        &self.context
    }

    fn resolve_renderers<'i>(&self, item: &'i Item) -> Result<Vec<(&'i Part, Arc<dyn PartRenderer>)>, ComposeError> {
        item.parts
            .iter()
            .map(|part| {
                let header = part.header();
                if keys::is_reserved(&header.id) {
                    return Err(render_error(
                        item,
                        part,
                        RenderError::Message(format!("part id `{}` is a reserved data key", header.id)),
                    ));
                }
                self.registry
                    .resolve(header)
                    .map(|renderer| (part, renderer))
                    .ok_or_else(|| ComposeError::UnregisteredRenderer {
                        item_id: item.id.clone(),
                        part_id: header.id.clone(),
                        key: PartKey::of(header).to_string(),
                    })
            })
            .collect()
    }
}

fn render_error(item: &Item, part: &Part, source: RenderError) -> ComposeError {
    ComposeError::Render {
        item_id: item.id.clone(),
        part_id: part.id().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::SegmentNode;
    use crate::model::{Fragment, GenericPart};
    use serde_json::Value;

    fn echo_type() -> impl PartRenderer {
        |part: &Value, _: &RenderingContext, _: Option<&SegmentNode>| -> Result<String, RenderError> {
            Ok(format!("[{}]", part["typeId"].as_str().unwrap_or_default()))
        }
    }

    fn item(id: &str) -> Item {
        Item::new(id, id)
            .with_part(Part::Text(TextPart::from_text(PartHeader::new(format!("{}-t", id), "text"), "a b")))
            .with_part(Part::Layer(
                LayerPart::new(PartHeader::new(format!("{}-l", id), "layer")).with_fragment(Fragment::comment("1.1", "c")),
            ))
    }

    #[test]
    fn test_compose_requires_open() {
        let mut composer = Composer::new(RendererRegistry::new(), ComposerSettings::default());
        assert!(matches!(composer.compose(&item("i")), Err(ComposeError::NotOpen)));
        assert!(matches!(composer.close(), Err(ComposeError::NotOpen)));
    }

    #[test]
    fn test_flows_per_part_key() {
        let registry = RendererRegistry::new()
            .with("text", None, echo_type())
            .with("layer", None, echo_type());
        let mut composer = Composer::new(registry, ComposerSettings::default());
        composer.open();
        composer.compose(&item("i1")).unwrap();
        composer.compose(&item("i2")).unwrap();
        composer.close().unwrap();

        assert_eq!(composer.flows().len(), 2);
        assert_eq!(composer.flows()["text"], "[text][text]");
        assert_eq!(composer.flows()["layer"], "[layer][layer]");
    }

    #[test]
    fn test_open_resets_flows() {
        let registry = RendererRegistry::new()
            .with("text", None, echo_type())
            .with("layer", None, echo_type());
        let mut composer = Composer::new(registry, ComposerSettings::default());
        composer.open();
        composer.compose(&item("i1")).unwrap();
        composer.close().unwrap();
        composer.open();
        assert!(composer.flows().is_empty());
    }

    #[test]
    fn test_other_parts_only_feed_data() {
        let registry = RendererRegistry::new()
            .with("text", None, |_: &Value, ctx: &RenderingContext, _: Option<&SegmentNode>| -> Result<String, RenderError> {
                Ok(format!("meta={}", ctx.get("m").unwrap_or("?")))
            })
            .with("layer", None, echo_type())
            .with("meta", None, echo_type());
        let it = item("i1").with_part(Part::Other(GenericPart::new(
            PartHeader::new("m", "meta"),
            Value::Null,
        )));

        let mut composer = Composer::new(registry, ComposerSettings::default());
        composer.open();
        composer.compose(&it).unwrap();

        assert_eq!(composer.flows().len(), 2);
        assert_eq!(composer.flows()["text"], "meta=[meta]");
        assert_eq!(composer.context().get("m"), Some("[meta]"));
    }

    #[test]
    fn test_layers_without_text_are_out_of_range() {
        let registry = RendererRegistry::new().with("layer", None, echo_type());
        let it = Item::new("i1", "One").with_part(Part::Layer(
            LayerPart::new(PartHeader::new("l1", "layer")).with_fragment(Fragment::comment("1.1", "c")),
        ));
        let mut composer = Composer::new(registry, ComposerSettings::default());
        composer.open();
        assert!(matches!(
            composer.compose(&it),
            Err(ComposeError::UnknownCoordinate { ref part_id, .. }) if part_id == "l1"
        ));
        assert!(composer.flows().is_empty());
    }

    #[test]
    fn test_part_id_cannot_shadow_item_keys() {
        let registry = RendererRegistry::new()
            .with("text", None, echo_type())
            .with("layer", None, echo_type())
            .with("meta", None, echo_type());
        let it = item("i1").with_part(Part::Other(GenericPart::new(
            PartHeader::new(keys::GROUP_ID, "meta"),
            Value::Null,
        )));
        let mut composer = Composer::new(registry, ComposerSettings::default());
        composer.open();
        match composer.compose(&it) {
            Err(ComposeError::Render { part_id, .. }) => assert_eq!(part_id, keys::GROUP_ID),
            other => panic!("unexpected {:?}", other),
        }
        assert!(composer.flows().is_empty());
    }

    #[test]
    fn test_renderer_failure_names_part() {
        let registry = RendererRegistry::new()
            .with("text", None, echo_type())
            .with("layer", None, |_: &Value, _: &RenderingContext, _: Option<&SegmentNode>| -> Result<String, RenderError> {
                Err(RenderError::Message("boom".into()))
            });
        let mut composer = Composer::new(registry, ComposerSettings::default());
        composer.open();
        match composer.compose(&item("i1")) {
            Err(ComposeError::Render { item_id, part_id, .. }) => {
                assert_eq!(item_id, "i1");
                assert_eq!(part_id, "i1-l");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(composer.flows().is_empty());
    }
}
