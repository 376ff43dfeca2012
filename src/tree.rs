//! Tree renderer
//!
//! Two halves:
//! - [`walk`] drives a [`SegmentVisitor`] over a segment tree, so text
//!   renderers only deal with open/close/leaf events
//! - [`TreeRenderer`] routes the rendered output of an item into flows,
//!   emitting group tails and heads on group transitions

use log::debug;

use crate::context::{keys, GroupPosition, RenderingContext, StagedItem};
use crate::errors::{ComposeError, RenderError};
use crate::flatten::{FragmentRef, Segment, SegmentNode};
use crate::group::GroupTransition;
use crate::settings::ComposerSettings;
use crate::templates::fill_template;

/// Events produced while walking a segment tree
pub trait SegmentVisitor {
    fn open_span(&mut self, fragment: &FragmentRef) -> Result<(), RenderError>;
    fn close_span(&mut self, fragment: &FragmentRef) -> Result<(), RenderError>;
    fn segment(&mut self, segment: &Segment) -> Result<(), RenderError>;
}

/// Depth-first, left-to-right walk
pub fn walk<V: SegmentVisitor + ?Sized>(node: &SegmentNode, visitor: &mut V) -> Result<(), RenderError> {
    match node {
        SegmentNode::Root { children } => children.iter().try_for_each(|c| walk(c, visitor)),
        SegmentNode::Span { fragment, children } => {
            visitor.open_span(fragment)?;
            children.iter().try_for_each(|c| walk(c, visitor))?;
            visitor.close_span(fragment)
        }
        SegmentNode::Leaf { segment } => visitor.segment(segment),
    }
}

/// Routes rendered parts into flows with group wrapping
#[derive(Debug, Clone, Copy)]
pub struct TreeRenderer<'a> {
    settings: &'a ComposerSettings,
}

impl<'a> TreeRenderer<'a> {
    pub fn new(settings: &'a ComposerSettings) -> Self {
        Self { settings }
    }

    /// Handle the group transition before an item's output is routed
    ///
    /// Tails for the outgoing group are filled from `committed`, which still
    /// holds the previous item's data.
    pub(crate) fn begin_item(
        &self,
        committed: &RenderingContext,
        staged: &mut StagedItem,
        incoming: Option<String>,
    ) -> Result<(), ComposeError> {
        let item_id = item_id_of(staged);
        let transition = GroupTransition::detect(staged.view.group(), incoming.as_deref());

        if let GroupTransition::Changed { outgoing, incoming } = &transition {
            debug!(
                "item {}: group {:?} -> {:?}",
                item_id,
                outgoing.as_deref().unwrap_or("-"),
                incoming.as_deref().unwrap_or("-")
            );

            let pending: Vec<String> = staged.view.group().pending.iter().cloned().collect();
            for flow in pending {
                if let Some(tail) = self.settings.wrap_for(&flow).tail {
                    let text = fill_template(&tail, committed.data()).map_err(|source| {
                        ComposeError::TemplateFill {
                            item_id: Some(item_id.clone()),
                            flow: flow.clone(),
                            source,
                        }
                    })?;
                    staged.write(flow, text);
                }
            }
            transition.apply(staged.view.group_mut());
        }

        let group = staged.view.group().clone();
        staged
            .view
            .set(keys::GROUP_ID, group.current_id().unwrap_or_default());
        staged.view.set(keys::GROUP_ORDINAL, group.ordinal.to_string());
        Ok(())
    }

    /// Append one part's output to its flow, opening the flow in the group first
    pub(crate) fn route(&self, staged: &mut StagedItem, flow: &str, content: &str) -> Result<(), ComposeError> {
        let in_group = matches!(staged.view.group().position, GroupPosition::InGroup { .. });
        if in_group && !staged.view.group().pending.contains(flow) {
            if let Some(head) = self.settings.wrap_for(flow).head {
                let text = fill_template(&head, staged.view.data()).map_err(|source| {
                    ComposeError::TemplateFill {
                        item_id: Some(item_id_of(staged)),
                        flow: flow.to_string(),
                        source,
                    }
                })?;
                staged.write(flow, text);
            }
            staged.view.group_mut().pending.insert(flow.to_string());
        }
        staged.write(flow, content);
        Ok(())
    }

    /// Close the last open group, appending its tails
    ///
    /// All tails are filled before any flow is touched.
    pub(crate) fn close(&self, context: &mut RenderingContext) -> Result<(), ComposeError> {
        if !context.group().has_pending() {
            return Ok(());
        }

        let mut tails = Vec::new();
        for flow in &context.group().pending {
            if let Some(tail) = self.settings.wrap_for(flow).tail {
                let text = fill_template(&tail, context.data()).map_err(|source| {
                    ComposeError::TemplateFill {
                        item_id: None,
                        flow: flow.clone(),
                        source,
                    }
                })?;
                tails.push((flow.clone(), text));
            }
        }

        debug!("closing group with {} tail(s)", tails.len());
        for (flow, text) in tails {
            context.append(&flow, &text);
        }
        context.group_mut().pending.clear();
        Ok(())
    }
}

fn item_id_of(staged: &StagedItem) -> String {
    staged.view.item().map(|i| i.id.clone()).unwrap_or_default()
}
