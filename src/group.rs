//! Item grouping
//!
//! Items sharing a group id belong to one output document. The composer asks
//! an [`ItemGrouper`] for each item's group and compares it with the group
//! currently open to decide whether wrappers must be emitted.
//!
//! ## States
//! - NoGroup: initial state, or the last item had no group
//! - InGroup(id, ordinal): items of group `id` are being written

use crate::context::{GroupPosition, GroupState};
use crate::model::Item;

/// Hook resolving the group of an item
pub trait ItemGrouper: Send + Sync {
    fn group_id(&self, item: &Item) -> Option<String>;
}

/// Default grouper: the item's own `group_id`
#[derive(Debug, Clone, Copy, Default)]
pub struct ByGroupId;

impl ItemGrouper for ByGroupId {
    fn group_id(&self, item: &Item) -> Option<String> {
        item.group_id.clone()
    }
}

impl<F> ItemGrouper for F
where
    F: Fn(&Item) -> Option<String> + Send + Sync,
{
    fn group_id(&self, item: &Item) -> Option<String> {
        self(item)
    }
}

/// What happens to the group state when an item arrives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupTransition {
    Unchanged,
    Changed {
        /// Group being closed, if one was open
        outgoing: Option<String>,
        /// Group being opened, `None` when moving to NoGroup
        incoming: Option<String>,
    },
}

impl GroupTransition {
    /// Compare the open group with an incoming item's group
    pub fn detect(state: &GroupState, incoming: Option<&str>) -> Self {
        let current = state.current_id();
        if current == incoming {
            GroupTransition::Unchanged
        } else {
            GroupTransition::Changed {
                outgoing: current.map(str::to_string),
                incoming: incoming.map(str::to_string),
            }
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, GroupTransition::Changed { .. })
    }

    /// Move the state past this transition
    ///
    /// Flows pending a tail are left for the caller to close before calling.
    pub fn apply(&self, state: &mut GroupState) {
        if let GroupTransition::Changed { incoming, .. } = self {
            state.ordinal += 1;
            state.pending.clear();
            state.position = match incoming {
                Some(id) => GroupPosition::InGroup {
                    id: id.clone(),
                    ordinal: state.ordinal,
                },
                None => GroupPosition::NoGroup,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(groups: &[Option<&str>]) -> (Vec<GroupTransition>, GroupState) {
        let mut state = GroupState::default();
        let transitions = groups
            .iter()
            .map(|g| {
                let t = GroupTransition::detect(&state, *g);
                t.apply(&mut state);
                t
            })
            .collect();
        (transitions, state)
    }

    #[test]
    fn test_first_group_has_no_outgoing() {
        let (transitions, state) = run(&[Some("A")]);
        assert_eq!(
            transitions[0],
            GroupTransition::Changed { outgoing: None, incoming: Some("A".into()) }
        );
        assert_eq!(state.position, GroupPosition::InGroup { id: "A".into(), ordinal: 1 });
    }

    #[test]
    fn test_abba_sequence() {
        let (transitions, state) = run(&[Some("A"), Some("B"), Some("B"), Some("A")]);
        let changed: Vec<bool> = transitions.iter().map(GroupTransition::is_changed).collect();
        assert_eq!(changed, vec![true, true, false, true]);
        assert_eq!(
            transitions[3],
            GroupTransition::Changed { outgoing: Some("B".into()), incoming: Some("A".into()) }
        );
        assert_eq!(state.ordinal, 3);
    }

    #[test]
    fn test_ungrouped_items() {
        let (transitions, state) = run(&[None, Some("A"), None, None]);
        let changed: Vec<bool> = transitions.iter().map(GroupTransition::is_changed).collect();
        assert_eq!(changed, vec![false, true, true, false]);
        assert_eq!(state.position, GroupPosition::NoGroup);
    }

    #[test]
    fn test_closure_grouper() {
        let by_facet = |item: &Item| Some(item.facet_id.clone());
        let mut item = Item::new("i", "t");
        item.facet_id = "poem".into();
        assert_eq!(by_facet.group_id(&item).as_deref(), Some("poem"));
        assert_eq!(ByGroupId.group_id(&item), None);
    }
}
