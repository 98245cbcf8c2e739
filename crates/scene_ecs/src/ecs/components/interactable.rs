//! Interactable component
//!
//! Marks an entity for the interactable system and holds its pointer state.

use crate::ecs::{Component, ComponentKind, ComponentType};

/// Pointer interaction state of an entity
///
/// Updated by the interactable system; at most one entity is hovered,
/// pressed or selected at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractableComponent {
    /// Pointer is over the entity
    pub hovered: bool,
    /// Pointer went down on the entity and has not been released
    pub pressed: bool,
    /// Last entity pressed and released under the pointer
    pub selected: bool,
}

impl InteractableComponent {
    /// Create an idle interactable
    pub fn new() -> Self {
        Self::default()
    }
}

impl Component for InteractableComponent {
    fn component_type(&self) -> ComponentType {
        Self::TYPE
    }

    fn destroy(&mut self) {
        *self = Self::default();
    }
}

impl ComponentKind for InteractableComponent {
    const TYPE: ComponentType = ComponentType::new("InteractableComponent");
}
