//! # Scene ECS
//!
//! A small entity-component-system runtime for interactive 3D scenes.
//!
//! ## Features
//!
//! - **ECS Architecture**: entities own components by type; systems process
//!   the entities their cached query selects
//! - **Event Bus**: every structural change is broadcast by name, and each
//!   entity carries its own local emitter
//! - **Viewport**: activated entities join the rendered scene, pointer samples
//!   are hit-tested and relayed to the entity under the pointer
//! - **Scene Objects**: primitives, lights and RON-described models
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_ecs::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = Engine::new(EngineConfig::default());
//!     engine.init()?;
//!
//!     let params = MeshParams::Primitive(PrimitiveParams::new(PrimitiveShape::Box));
//!     let cube = pollster::block_on(engine.manager().create_entity_with_params(params))?;
//!     engine.manager().activate_entity(&cube);
//!
//!     engine.run_frames(60)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod ecs;
pub mod events;
pub mod foundation;
pub mod scene;

mod engine;

pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, EngineConfig, ViewportSettings},
        ecs::{
            components::{
                ActionComponent, ActionData, AnimationComponent, AnimationParams, Behavior,
                InteractableComponent, MeshComponent, MeshParams, ModelParams,
            },
            systems::{EventActionSystem, InteractableSystem, ViewportHandle, ViewportSystem},
            Component, ComponentKind, EcsError, Entity, EntityId, EntityRef, Manager, Query,
            System, SystemKind,
        },
        events::{names, Event, EventBus, PointerEvent, PointerKind},
        foundation::math::{Mat4, Transform, Vec3},
        scene::{
            HeadlessRenderer, LightKind, LightParams, PrimitiveParams, PrimitiveShape,
            RonModelLoader, SceneHandle, SceneRenderer,
        },
        Engine, EngineError,
    };
}
