//! Entity-Component-System implementation
//!
//! Entities own components by type, systems process the entities a query
//! selects, and the [`Manager`] drives both through their lifecycle. All
//! state changes are announced on the global [`EventBus`](crate::events::EventBus).

pub mod component;
pub mod components;
pub mod entity;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod query;
pub mod system;
pub mod systems;

#[cfg(test)]
mod tests;

pub use component::{AsAny, Component, ComponentHandle, ComponentId, ComponentKind, ComponentType};
pub use entity::{Entity, EntityFlags, EntityId, EntityRef};
pub use error::EcsError;
pub use lifecycle::LifecycleFlags;
pub use manager::Manager;
pub use query::{matches_filter, EntityRegistry, Query, QueryResults, WeakRegistry};
pub use system::{System, SystemHandle, SystemId, SystemKind, SystemType};
