//! Built-in renderers
//!
//! TEI-flavoured renderers for the base text and the common layers, plus a
//! mustache renderer for arbitrary parts. Text and layers are linked in
//! standoff fashion through fragment anchors.

pub mod layers;
pub mod template;
pub mod text;

pub use layers::{ApparatusRenderer, CommentRenderer};
pub use template::TemplatePartRenderer;
pub use text::{PlainTextRenderer, XmlTextRenderer};

use crate::registry::RendererRegistry;

/// Type id of token-based text parts
pub const TOKEN_TEXT_TYPE: &str = "it.vedph.token-text";
/// Type id of layer parts over token-based text
pub const TOKEN_TEXT_LAYER_TYPE: &str = "it.vedph.token-text-layer";
/// Role of apparatus layers
pub const APPARATUS_ROLE: &str = "fr.it.vedph.apparatus";
/// Role of comment layers
pub const COMMENT_ROLE: &str = "fr.it.vedph.comment";

/// Registry binding the built-in renderers to the standard type/role ids
pub fn tei_registry() -> RendererRegistry {
    RendererRegistry::new()
        .with(TOKEN_TEXT_TYPE, None, XmlTextRenderer::default())
        .with(TOKEN_TEXT_LAYER_TYPE, Some(APPARATUS_ROLE), ApparatusRenderer)
        .with(TOKEN_TEXT_LAYER_TYPE, Some(COMMENT_ROLE), CommentRenderer)
}
