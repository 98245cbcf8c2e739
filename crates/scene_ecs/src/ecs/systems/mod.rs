//! Built-in systems

pub mod event_action;
pub mod interactable;
pub mod viewport;

pub use event_action::{
    Action, ActionFactory, ActionRegistry, EventActionSystem, RotateObject, ToggleVisibility,
};
pub use interactable::InteractableSystem;
pub use viewport::{ViewportHandle, ViewportSystem};
