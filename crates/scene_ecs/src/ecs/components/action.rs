//! Action component
//!
//! Lists named actions to run when the entity emits a local event. The
//! event-action system turns each entry into a fresh action instance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ecs::{Component, ComponentKind, ComponentType};

/// One action bound to a local entity event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
    /// Registered action name, e.g. `rotateObject`
    pub action_name: String,
    /// Local entity event that triggers the action, e.g. `click`
    pub event_name: String,
    /// Numeric parameters handed to the action factory
    #[serde(default)]
    pub params: BTreeMap<String, f32>,
}

impl ActionData {
    /// Bind `action_name` to `event_name` without parameters
    pub fn new(action_name: impl Into<String>, event_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            event_name: event_name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a numeric parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: f32) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Parameter value or `default`
    pub fn param_or(&self, key: &str, default: f32) -> f32 {
        self.params.get(key).copied().unwrap_or(default)
    }
}

#[derive(Debug, Clone)]
struct ActionEntry {
    data: ActionData,
    bound: bool,
}

/// Actions of an entity
#[derive(Debug, Clone, Default)]
pub struct ActionComponent {
    entries: Vec<ActionEntry>,
}

impl ActionComponent {
    /// Create an empty action list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action
    #[must_use]
    pub fn with_action(mut self, data: ActionData) -> Self {
        self.push(data);
        self
    }

    /// Append an action; it is bound on the next build
    pub fn push(&mut self, data: ActionData) {
        self.entries.push(ActionEntry { data, bound: false });
    }

    /// All actions in insertion order
    pub fn actions(&self) -> impl Iterator<Item = &ActionData> {
        self.entries.iter().map(|entry| &entry.data)
    }

    /// Number of actions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Actions not bound yet, with their index
    pub fn pending(&self) -> Vec<(usize, ActionData)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.bound)
            .map(|(index, entry)| (index, entry.data.clone()))
            .collect()
    }

    /// Whether the action at `index` is bound
    pub fn is_bound(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|entry| entry.bound)
    }

    pub(crate) fn mark_bound(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.bound = true;
        }
    }
}

impl Component for ActionComponent {
    fn component_type(&self) -> ComponentType {
        Self::TYPE
    }

    fn destroy(&mut self) {
        self.entries.clear();
    }
}

impl ComponentKind for ActionComponent {
    const TYPE: ComponentType = ComponentType::new("ActionComponent");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_skips_bound_actions() {
        let mut actions = ActionComponent::new()
            .with_action(ActionData::new("rotateObject", "click"))
            .with_action(ActionData::new("toggleVisibility", "start"));
        actions.mark_bound(0);

        let pending = actions.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, 1);
        assert_eq!(pending[0].1.action_name, "toggleVisibility");
        assert!(actions.is_bound(0));
        assert!(!actions.is_bound(7));
    }

    #[test]
    fn test_params_from_ron() {
        let data: ActionData = ron::from_str(
            r#"(action_name: "rotateObject", event_name: "click", params: {"rotY": 0.02})"#,
        )
        .unwrap();
        assert!((data.param_or("rotY", 0.0) - 0.02).abs() < f32::EPSILON);
        assert!((data.param_or("rotX", 0.005) - 0.005).abs() < f32::EPSILON);
    }
}
