//! Retained scene-graph nodes
//!
//! A [`SceneHandle`] is shared between the owning entity, the renderer and
//! any system that inspects it. Only "is this renderable" is interpreted by
//! the ECS core; the rest is data for the rendering side.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::bounds::Aabb;
use super::factory::{LightKind, MaterialKind, PrimitiveShape};
use crate::ecs::EntityId;
use crate::foundation::math::{Mat4, Transform};

/// Named animation clip attached to a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    /// Clip name
    pub name: String,
    /// Length in seconds
    pub duration: f32,
}

impl AnimationClip {
    /// Create a clip
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

/// Surface of a renderable node
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Geometry kind
    pub shape: PrimitiveShape,
    /// Material kind
    pub material: MaterialKind,
    /// Base color as `0xRRGGBB`
    pub color: u32,
    /// Local-space bounds
    pub bounds: Aabb,
}

/// Light source parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LightData {
    /// Light kind
    pub kind: LightKind,
    /// Color as `0xRRGGBB`
    pub color: u32,
    /// Intensity
    pub intensity: f32,
}

/// What a node represents
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Container without geometry
    Group,
    /// Renderable geometry
    Mesh(MeshData),
    /// Light source
    Light(LightData),
}

/// Scene-graph node data
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Display name
    pub name: String,
    /// Node kind
    pub kind: NodeKind,
    /// Local transform relative to the parent
    pub transform: Transform,
    /// Visibility flag
    pub visible: bool,
    /// Owning entity, set when the node is placed on the rendered scene
    pub entity_id: Option<EntityId>,
    /// Child nodes
    pub children: Vec<SceneHandle>,
    /// Animation clips
    pub animations: Vec<AnimationClip>,
}

impl SceneNode {
    /// Create a visible node with an identity transform
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: Transform::identity(),
            visible: true,
            entity_id: None,
            children: Vec::new(),
            animations: Vec::new(),
        }
    }
}

/// Shared handle to a scene-graph node
#[derive(Clone)]
pub struct SceneHandle(Rc<RefCell<SceneNode>>);

impl SceneHandle {
    /// Wrap a node
    pub fn new(node: SceneNode) -> Self {
        Self(Rc::new(RefCell::new(node)))
    }

    /// Empty group node
    pub fn group() -> Self {
        Self::new(SceneNode::new("group", NodeKind::Group))
    }

    /// Node name
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// Rename the node
    pub fn set_name(&self, name: impl Into<String>) {
        self.0.borrow_mut().name = name.into();
    }

    /// Node kind
    pub fn kind(&self) -> NodeKind {
        self.0.borrow().kind.clone()
    }

    /// Whether the node carries geometry that can be hit
    pub fn is_renderable(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Mesh(_))
    }

    /// Whether the node is a light source
    pub fn is_light(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Light(_))
    }

    /// Local transform
    pub fn transform(&self) -> Transform {
        self.0.borrow().transform.clone()
    }

    /// Replace the local transform
    pub fn set_transform(&self, transform: Transform) {
        self.0.borrow_mut().transform = transform;
    }

    /// Mutably borrow the local transform
    pub fn transform_mut(&self) -> RefMut<'_, Transform> {
        RefMut::map(self.0.borrow_mut(), |node| &mut node.transform)
    }

    /// Local transform as a matrix
    pub fn local_matrix(&self) -> Mat4 {
        self.0.borrow().transform.to_matrix()
    }

    /// Visibility flag
    pub fn is_visible(&self) -> bool {
        self.0.borrow().visible
    }

    /// Set the visibility flag
    pub fn set_visible(&self, visible: bool) {
        self.0.borrow_mut().visible = visible;
    }

    /// Entity tag
    pub fn entity_id(&self) -> Option<EntityId> {
        self.0.borrow().entity_id
    }

    /// Set the entity tag on this node only
    pub fn set_entity_id(&self, entity_id: Option<EntityId>) {
        self.0.borrow_mut().entity_id = entity_id;
    }

    /// Append a child node
    pub fn add_child(&self, child: SceneHandle) {
        self.0.borrow_mut().children.push(child);
    }

    /// Child handles
    pub fn children(&self) -> Vec<SceneHandle> {
        self.0.borrow().children.clone()
    }

    /// Animation clips
    pub fn animations(&self) -> Vec<AnimationClip> {
        self.0.borrow().animations.clone()
    }

    /// Look up a clip by name
    pub fn animation(&self, name: &str) -> Option<AnimationClip> {
        self.0
            .borrow()
            .animations
            .iter()
            .find(|clip| clip.name == name)
            .cloned()
    }

    /// Replace the animation clips
    pub fn set_animations(&self, animations: Vec<AnimationClip>) {
        self.0.borrow_mut().animations = animations;
    }

    /// Borrow the node data
    pub fn borrow(&self) -> Ref<'_, SceneNode> {
        self.0.borrow()
    }

    /// Visit this node and its descendants depth-first, parents first
    ///
    /// No borrow is held while `visit` runs, so it may mutate the node.
    pub fn traverse<F>(&self, visit: &mut F)
    where
        F: FnMut(&SceneHandle),
    {
        visit(self);
        for child in self.children() {
            child.traverse(visit);
        }
    }

    /// Tag this node and every descendant with an entity id
    pub fn tag_entity(&self, entity_id: Option<EntityId>) {
        self.traverse(&mut |node| node.set_entity_id(entity_id));
    }

    /// Whether two handles refer to the same node
    pub fn ptr_eq(&self, other: &SceneHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SceneHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.0.borrow();
        f.debug_struct("SceneHandle")
            .field("name", &node.name)
            .field("kind", &node.kind)
            .field("entity_id", &node.entity_id)
            .field("children", &node.children.len())
            .finish()
    }
}
