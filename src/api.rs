//! WASM API
//!
//! JavaScript-facing entry points. Items and settings come in as strings
//! (JSON items, YAML or JSON settings); flows go back as a plain object
//! mapping flow name to text.

use std::collections::BTreeMap;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::export::{export_items, items_from_json};
use crate::renderers::tei_registry;
use crate::settings::ComposerSettings;

#[wasm_bindgen(start)]
pub fn start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    {
        if console_log::init_with_level(log::Level::Debug).is_err() {
            log::warn!("logger already initialized");
        }
    }

    log::info!("cadmus-export WASM module initialized");
}

fn to_js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    let msg = format!("{}: {}", context, err);
    log::error!("{}", msg);
    JsValue::from_str(&msg)
}

fn serialize<T: Serialize>(value: &T, context: &str) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| to_js_error(context, e))
}

/// Settings text may be YAML or JSON; empty means defaults
fn parse_settings(text: &str) -> Result<ComposerSettings, JsValue> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(ComposerSettings::default());
    }
    let parsed = if text.starts_with('{') {
        ComposerSettings::from_json_str(text)
    } else {
        ComposerSettings::from_yaml_str(text)
    };
    parsed.map_err(|e| to_js_error("settings", e))
}

/// Compose items with the built-in TEI renderers
///
/// # Returns
/// Object mapping flow name → rendered text
#[wasm_bindgen(js_name = exportItems)]
pub fn export_items_js(items_json: &str, settings: &str) -> Result<JsValue, JsValue> {
    let settings = parse_settings(settings)?;
    let items = items_from_json(items_json).map_err(|e| to_js_error("items", e))?;
    log::debug!("exportItems: {} item(s)", items.len());

    let flows: BTreeMap<String, String> =
        export_items(tei_registry(), settings, items).map_err(|e| to_js_error("export", e))?;
    serialize(&flows, "flows")
}

/// Validate a single location string, returning its canonical form
#[wasm_bindgen(js_name = parseLocation)]
pub fn parse_location_js(location: &str) -> Result<String, JsValue> {
    location
        .parse::<crate::coords::Location>()
        .map(|loc| loc.to_string())
        .map_err(|e| to_js_error("location", e))
}
