//! Cadmus export
//!
//! Composes layered philological items (a base text plus annotation layers)
//! into named output flows. Layers are merged with the text into a tree of
//! segments, every part is rendered through a pluggable registry, and items
//! sharing a group id are wrapped by head/tail templates.

pub mod api;
pub mod composer;
pub mod context;
pub mod coords;
pub mod errors;
pub mod export;
pub mod flatten;
pub mod group;
pub mod model;
pub mod registry;
pub mod renderers;
pub mod settings;
pub mod templates;
pub mod tree;

// Re-export commonly used types
pub use composer::Composer;
pub use context::RenderingContext;
pub use coords::{Coordinate, Location, SpanRelation};
pub use errors::{ComposeError, ExportError, FlattenError, RenderError, SettingsError, SpanError, TemplateError};
pub use export::{export_items, items_from_json};
pub use flatten::{flatten, fragment_anchor, FragmentRef, Segment, SegmentNode, SegmentTree};
pub use group::{ByGroupId, ItemGrouper};
pub use model::{ApparatusEntry, ApparatusEntryType, Fragment, FragmentKind, Item, LayerPart, Part, PartHeader, TextPart};
pub use registry::{PartKey, PartRenderer, RendererRegistry};
pub use settings::{ComposerSettings, WrapTemplates};
