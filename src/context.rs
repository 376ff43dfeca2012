//! Rendering context shared by every stage of a composition run
//!
//! Holds the template data bag, a snapshot of the current item, the
//! group-tracking state and the accumulated flows. Renderers only get a
//! shared reference; the composer owns the context and is the only writer.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::Item;

/// Well-known data keys filled by the composer for every item
pub mod keys {
    pub const ITEM_ID: &str = "item_id";
    pub const ITEM_TITLE: &str = "item_title";
    pub const ITEM_DESCRIPTION: &str = "item_description";
    pub const ITEM_FACET: &str = "item_facet";
    pub const ITEM_SORT_KEY: &str = "item_sort_key";
    pub const ITEM_FLAGS: &str = "item_flags";
    pub const GROUP_ID: &str = "group_id";
    pub const GROUP_ORDINAL: &str = "group_ordinal";

    const ALL: [&str; 8] = [
        ITEM_ID,
        ITEM_TITLE,
        ITEM_DESCRIPTION,
        ITEM_FACET,
        ITEM_SORT_KEY,
        ITEM_FLAGS,
        GROUP_ID,
        GROUP_ORDINAL,
    ];

    /// True for keys the composer fills itself
    pub fn is_reserved(key: &str) -> bool {
        ALL.contains(&key)
    }
}

/// Metadata of the item being composed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub facet_id: String,
    pub group_id: Option<String>,
    pub sort_key: String,
    pub flags: u32,
    pub creator_id: String,
    pub user_id: String,
}

impl From<&Item> for ItemInfo {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            facet_id: item.facet_id.clone(),
            group_id: item.group_id.clone(),
            sort_key: item.sort_key.clone(),
            flags: item.flags,
            creator_id: item.creator_id.clone(),
            user_id: item.user_id.clone(),
        }
    }
}

/// Where the run currently is with respect to item groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum GroupPosition {
    #[default]
    NoGroup,
    InGroup { id: String, ordinal: u32 },
}

/// Group-tracking state, carried across the whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupState {
    pub position: GroupPosition,
    /// Incremented on every group change
    pub ordinal: u32,
    /// Flows that received a head in the open group and still need a tail
    pub pending: BTreeSet<String>,
}

impl GroupState {
    pub fn current_id(&self) -> Option<&str> {
        match &self.position {
            GroupPosition::InGroup { id, .. } => Some(id),
            GroupPosition::NoGroup => None,
        }
    }

    /// True when a group is open and some flow awaits its closing tail
    pub fn has_pending(&self) -> bool {
        matches!(self.position, GroupPosition::InGroup { .. }) && !self.pending.is_empty()
    }
}

/// Mutable per-run state
#[derive(Debug, Clone, Default)]
pub struct RenderingContext {
    /// Values set before the run; restored on every reset
    globals: BTreeMap<String, String>,
    data: BTreeMap<String, String>,
    item: Option<ItemInfo>,
    group: GroupState,
    flows: BTreeMap<String, String>,
}

impl RenderingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_globals(globals: BTreeMap<String, String>) -> Self {
        Self {
            data: globals.clone(),
            globals,
            ..Default::default()
        }
    }

    /// Start a new run: group state, flows and per-item data are cleared
    pub fn reset(&mut self) {
        self.data = self.globals.clone();
        self.item = None;
        self.group = GroupState::default();
        self.flows.clear();
    }

    pub fn data(&self) -> &BTreeMap<String, String> {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn item(&self) -> Option<&ItemInfo> {
        self.item.as_ref()
    }

    pub fn group(&self) -> &GroupState {
        &self.group
    }

    pub fn flows(&self) -> &BTreeMap<String, String> {
        &self.flows
    }

    pub fn flow(&self, name: &str) -> Option<&str> {
        self.flows.get(name).map(String::as_str)
    }

    /// Begin staging an item on top of the committed state
    pub(crate) fn stage(&self, item: &Item) -> StagedItem {
        let mut data = self.globals.clone();
        data.insert(keys::ITEM_ID.to_string(), item.id.clone());
        data.insert(keys::ITEM_TITLE.to_string(), item.title.clone());
        data.insert(keys::ITEM_DESCRIPTION.to_string(), item.description.clone());
        data.insert(keys::ITEM_FACET.to_string(), item.facet_id.clone());
        data.insert(keys::ITEM_SORT_KEY.to_string(), item.sort_key.clone());
        data.insert(keys::ITEM_FLAGS.to_string(), item.flags.to_string());

        StagedItem {
            view: RenderingContext {
                globals: self.globals.clone(),
                data,
                item: Some(ItemInfo::from(item)),
                group: self.group.clone(),
                flows: BTreeMap::new(),
            },
            writes: Vec::new(),
        }
    }

    /// Apply a fully composed item
    pub(crate) fn commit(&mut self, staged: StagedItem) {
        let StagedItem { view, writes } = staged;
        self.data = view.data;
        self.item = view.item;
        self.group = view.group;
        for (flow, text) in writes {
            self.flows.entry(flow).or_default().push_str(&text);
        }
    }

    pub(crate) fn group_mut(&mut self) -> &mut GroupState {
        &mut self.group
    }

    /// Direct append, used for the closing wrap-up
    pub(crate) fn append(&mut self, flow: &str, text: &str) {
        self.flows.entry(flow.to_string()).or_default().push_str(text);
    }
}

/// Item composition in progress
///
/// Renderers see `view` (committed flows are not visible to them). Flow
/// writes are queued and only land in the real context on commit, so a
/// failed item leaves no trace.
#[derive(Debug)]
pub(crate) struct StagedItem {
    pub view: RenderingContext,
    pub writes: Vec<(String, String)>,
}

impl StagedItem {
    pub fn write(&mut self, flow: impl Into<String>, text: impl Into<String>) {
        self.writes.push((flow.into(), text.into()));
    }
}
