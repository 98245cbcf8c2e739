//! Built-in components

pub mod action;
pub mod animation;
pub mod behavior;
pub mod interactable;
pub mod mesh;

pub use action::{ActionComponent, ActionData};
pub use animation::{AnimationComponent, AnimationParams};
pub use behavior::Behavior;
pub use interactable::InteractableComponent;
pub use mesh::{MeshComponent, MeshKind, MeshParams, ModelParams};
