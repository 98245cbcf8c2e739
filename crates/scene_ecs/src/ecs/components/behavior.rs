//! Behavior component
//!
//! Binds a callback to a local entity event such as `click`. The entity
//! registers the callback when the component is attached and drops it when
//! the component is removed or replaced.

use std::fmt;

use crate::ecs::{Component, ComponentKind, ComponentType};
use crate::events::{listener, Event, Listener};

/// Callback bound to a local entity event
pub struct Behavior {
    event_name: String,
    action: Listener,
}

impl Behavior {
    /// Bind `action` to the local event `event_name`
    ///
    /// ```
    /// # use scene_ecs::ecs::components::Behavior;
    /// let behavior = Behavior::new("click", |_event| {});
    /// assert_eq!(behavior.event_name(), "click");
    /// ```
    pub fn new<F>(event_name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&Event) + 'static,
    {
        Self {
            event_name: event_name.into(),
            action: listener(action),
        }
    }

    /// Local event the behavior reacts to
    pub fn event_name(&self) -> &str {
        &self.event_name
    }
}

impl Component for Behavior {
    fn component_type(&self) -> ComponentType {
        Self::TYPE
    }

    fn behavior(&self) -> Option<(&str, Listener)> {
        Some((&self.event_name, self.action.clone()))
    }
}

impl ComponentKind for Behavior {
    const TYPE: ComponentType = ComponentType::new("Behavior");
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior")
            .field("event_name", &self.event_name)
            .finish_non_exhaustive()
    }
}
