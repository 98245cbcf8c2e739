//! Object factory for primitive meshes and lights

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::bounds::Aabb;
use super::node::{LightData, MeshData, NodeKind, SceneHandle, SceneNode};
use crate::ecs::EcsError;
use crate::foundation::math::Vec3;

/// Color used when a primitive does not specify one
pub const DEFAULT_MESH_COLOR: u32 = 0x00cc_cccc;

/// Color of every light created by the factory
pub const LIGHT_COLOR: u32 = 0x00ff_ffff;

/// Geometry of a primitive mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveShape {
    /// Unit cube
    Box,
    /// Unit-radius sphere
    Sphere,
    /// Unit cylinder
    Cylinder,
    /// Unit square in the XY plane
    Plane,
}

impl PrimitiveShape {
    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveShape::Box => "box",
            PrimitiveShape::Sphere => "sphere",
            PrimitiveShape::Cylinder => "cylinder",
            PrimitiveShape::Plane => "plane",
        }
    }
}

impl FromStr for PrimitiveShape {
    type Err = EcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "box" => Ok(PrimitiveShape::Box),
            "sphere" => Ok(PrimitiveShape::Sphere),
            "cylinder" => Ok(PrimitiveShape::Cylinder),
            "plane" => Ok(PrimitiveShape::Plane),
            other => Err(EcsError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for PrimitiveShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Surface material of a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    /// Normal-colored debug material
    Normal,
    /// Lit material
    #[default]
    Standard,
    /// Unlit flat color
    Basic,
}

/// Kind of light source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    /// Uniform light from every direction
    Ambient,
    /// Parallel rays
    Directional,
    /// Sky/ground gradient
    Hemisphere,
    /// Omnidirectional point source
    Point,
    /// Cone-shaped source
    Spot,
}

impl FromStr for LightKind {
    type Err = EcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ambient" => Ok(LightKind::Ambient),
            "directional" => Ok(LightKind::Directional),
            "hemisphere" => Ok(LightKind::Hemisphere),
            "point" => Ok(LightKind::Point),
            "spot" => Ok(LightKind::Spot),
            other => Err(EcsError::UnknownKind(other.to_string())),
        }
    }
}

/// Parameters of a primitive mesh
///
/// Unset dimensions fall back to a unit-sized shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveParams {
    /// Geometry kind
    #[serde(rename = "type")]
    pub shape: PrimitiveShape,
    /// Base color as `0xRRGGBB`
    #[serde(default)]
    pub color: Option<u32>,
    /// Material kind
    #[serde(default)]
    pub material: MaterialKind,
    /// Width (box, plane)
    #[serde(default)]
    pub width: Option<f32>,
    /// Height (box, cylinder, plane)
    #[serde(default)]
    pub height: Option<f32>,
    /// Depth (box)
    #[serde(default)]
    pub depth: Option<f32>,
    /// Radius (sphere, cylinder)
    #[serde(default)]
    pub radius: Option<f32>,
}

impl PrimitiveParams {
    /// Parameters for a unit shape with default material
    pub fn new(shape: PrimitiveShape) -> Self {
        Self {
            shape,
            color: None,
            material: MaterialKind::default(),
            width: None,
            height: None,
            depth: None,
            radius: None,
        }
    }

    /// Set the base color
    #[must_use]
    pub fn with_color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    /// Set the material
    #[must_use]
    pub fn with_material(mut self, material: MaterialKind) -> Self {
        self.material = material;
        self
    }

    /// Local-space half extents of the shape
    pub fn half_extents(&self) -> Vec3 {
        let width = self.width.unwrap_or(1.0);
        let height = self.height.unwrap_or(1.0);
        let depth = self.depth.unwrap_or(1.0);
        let radius = self.radius.unwrap_or(1.0);
        match self.shape {
            PrimitiveShape::Box => Vec3::new(width, height, depth) * 0.5,
            PrimitiveShape::Sphere => Vec3::repeat(radius),
            PrimitiveShape::Cylinder => Vec3::new(radius, height * 0.5, radius),
            PrimitiveShape::Plane => Vec3::new(width * 0.5, height * 0.5, 0.0),
        }
    }
}

/// Parameters of a light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightParams {
    /// Light kind
    #[serde(rename = "type")]
    pub kind: LightKind,
}

impl LightParams {
    /// Parameters for a light kind
    pub fn new(kind: LightKind) -> Self {
        Self { kind }
    }
}

/// Build a mesh node for a primitive
pub fn create_primitive_mesh(params: &PrimitiveParams) -> SceneHandle {
    let data = MeshData {
        shape: params.shape,
        material: params.material,
        color: params.color.unwrap_or(DEFAULT_MESH_COLOR),
        bounds: Aabb::from_center_extents(Vec3::zeros(), params.half_extents()),
    };
    SceneHandle::new(SceneNode::new(params.shape.name(), NodeKind::Mesh(data)))
}

/// Build a light node
pub fn create_light(params: &LightParams) -> SceneHandle {
    let (name, intensity) = match params.kind {
        LightKind::Ambient => ("ambient-light", 0.5),
        LightKind::Directional => ("directional-light", 0.5),
        LightKind::Hemisphere => ("hemisphere-light", 1.0),
        LightKind::Point => ("point-light", 1.0),
        LightKind::Spot => ("spot-light", 1.0),
    };
    let data = LightData {
        kind: params.kind,
        color: LIGHT_COLOR,
        intensity,
    };
    SceneHandle::new(SceneNode::new(name, NodeKind::Light(data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_defaults_to_unit_cube() {
        let node = create_primitive_mesh(&PrimitiveParams::new(PrimitiveShape::Box));
        assert!(node.is_renderable());
        match node.kind() {
            NodeKind::Mesh(mesh) => {
                assert_eq!(mesh.color, DEFAULT_MESH_COLOR);
                assert_eq!(mesh.material, MaterialKind::Standard);
                assert_relative_eq!(mesh.bounds.extents().x, 0.5);
            }
            other => panic!("expected mesh, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_dimensions() {
        let params = PrimitiveParams {
            radius: Some(2.0),
            height: Some(4.0),
            ..PrimitiveParams::new(PrimitiveShape::Cylinder)
        };
        let extents = params.half_extents();
        assert_relative_eq!(extents.x, 2.0);
        assert_relative_eq!(extents.y, 2.0);
    }

    #[test]
    fn test_lights_are_not_renderable() {
        let light = create_light(&LightParams::new(LightKind::Point));
        assert!(light.is_light());
        assert!(!light.is_renderable());
    }

    #[test]
    fn test_unknown_shape_is_rejected() {
        assert!(matches!(
            "torus".parse::<PrimitiveShape>(),
            Err(EcsError::UnknownKind(kind)) if kind == "torus"
        ));
        assert_eq!("spot".parse::<LightKind>().ok(), Some(LightKind::Spot));
    }

    #[test]
    fn test_params_from_ron() {
        let params: PrimitiveParams =
            ron::from_str("(type: sphere, color: Some(255), radius: Some(3.0))").unwrap();
        assert_eq!(params.shape, PrimitiveShape::Sphere);
        assert_eq!(params.color, Some(255));
        assert_eq!(params.material, MaterialKind::Standard);
    }
}
