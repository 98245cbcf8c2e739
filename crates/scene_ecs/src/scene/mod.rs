//! Scene-graph collaborators
//!
//! The ECS core treats the scene graph as an external library: entities own
//! one [`SceneHandle`] each, the viewport system hands those handles to a
//! [`SceneRenderer`], and models arrive through a [`ModelLoader`].
//!
//! ```text
//! Manager / Entities (ECS)
//!      ↓ SceneHandle
//! ViewportSystem
//!      ↓
//! SceneRenderer (headless or GPU backed)
//! ```

mod bounds;
mod factory;
mod loader;
mod node;
mod renderer;

pub use bounds::Aabb;
pub use factory::{
    create_light, create_primitive_mesh, LightKind, LightParams, MaterialKind, PrimitiveParams,
    PrimitiveShape, DEFAULT_MESH_COLOR, LIGHT_COLOR,
};
pub use loader::{
    LoadError, LoadFuture, LoadedModel, ModelDescription, ModelLoader, NodeDescription,
    RonModelLoader,
};
pub use node::{AnimationClip, LightData, MeshData, NodeKind, SceneHandle, SceneNode};
pub use renderer::{HeadlessRenderer, PickHit, SceneRenderer};
