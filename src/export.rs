//! One-shot export helpers
//!
//! Wraps a whole composition run: items in, flows out. Items coming from
//! JSON are put in `sort_key` order before composing.

use std::collections::BTreeMap;

use log::info;

use crate::composer::Composer;
use crate::errors::ExportError;
use crate::model::Item;
use crate::registry::RendererRegistry;
use crate::settings::ComposerSettings;

/// Parse a JSON array of items and order them by sort key
///
/// The sort is stable: items sharing a key keep their source order.
pub fn items_from_json(json: &str) -> Result<Vec<Item>, ExportError> {
    let mut items: Vec<Item> = serde_json::from_str(json)?;
    items.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
    Ok(items)
}

/// Run open, compose for every item, close; return the flows
pub fn export_items<I>(
    registry: RendererRegistry,
    settings: ComposerSettings,
    items: I,
) -> Result<BTreeMap<String, String>, ExportError>
where
    I: IntoIterator<Item = Item>,
{
    let mut composer = Composer::new(registry, settings);
    composer.open();

    let mut count = 0usize;
    for item in items {
        composer.compose(&item)?;
        count += 1;
    }
    composer.close()?;

    info!("exported {} item(s) into {} flow(s)", count, composer.flows().len());
    Ok(composer.flows().clone())
}
