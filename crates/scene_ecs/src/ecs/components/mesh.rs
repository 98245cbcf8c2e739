//! Mesh component
//!
//! Records the parameters an entity's scene object was built from. The
//! viewport system queries for it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ecs::{Component, ComponentKind, ComponentType, EcsError};
use crate::scene::{LightParams, PrimitiveParams};

/// Parameters of a loaded model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Location relative to the loader's asset root
    pub url: String,
}

impl ModelParams {
    /// Parameters for a model url
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Kind of scene object an entity is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshKind {
    /// Light source
    Light,
    /// Primitive mesh
    Primitive,
    /// Loaded model
    Model,
}

impl MeshKind {
    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            MeshKind::Light => "light",
            MeshKind::Primitive => "primitive",
            MeshKind::Model => "model",
        }
    }
}

impl FromStr for MeshKind {
    type Err = EcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(MeshKind::Light),
            "primitive" => Ok(MeshKind::Primitive),
            "model" => Ok(MeshKind::Model),
            other => Err(EcsError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for MeshKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tagged scene-object parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeshParams {
    /// Light source
    Light(LightParams),
    /// Primitive mesh
    Primitive(PrimitiveParams),
    /// Loaded model
    Model(ModelParams),
}

impl MeshParams {
    /// Parse a kind name and a RON body into params
    ///
    /// ```
    /// # use scene_ecs::ecs::components::MeshParams;
    /// let params = MeshParams::parse("primitive", "(type: box)").unwrap();
    /// assert_eq!(params.kind().name(), "primitive");
    /// ```
    pub fn parse(kind: &str, body: &str) -> Result<Self, EcsError> {
        let invalid = |e: ron::error::SpannedError| EcsError::InvalidParams(e.to_string());
        match kind.parse::<MeshKind>()? {
            MeshKind::Light => ron::from_str(body).map(MeshParams::Light).map_err(invalid),
            MeshKind::Primitive => ron::from_str(body).map(MeshParams::Primitive).map_err(invalid),
            MeshKind::Model => ron::from_str(body).map(MeshParams::Model).map_err(invalid),
        }
    }

    /// Kind of the params
    pub fn kind(&self) -> MeshKind {
        match self {
            MeshParams::Light(_) => MeshKind::Light,
            MeshParams::Primitive(_) => MeshKind::Primitive,
            MeshParams::Model(_) => MeshKind::Model,
        }
    }
}

/// Component remembering how an entity's scene object was built
#[derive(Debug, Clone)]
pub struct MeshComponent {
    params: Option<MeshParams>,
}

impl MeshComponent {
    /// Create a mesh component
    pub fn new(params: MeshParams) -> Self {
        Self {
            params: Some(params),
        }
    }

    /// Build params, `None` once destroyed
    pub fn params(&self) -> Option<&MeshParams> {
        self.params.as_ref()
    }
}

impl Component for MeshComponent {
    fn component_type(&self) -> ComponentType {
        Self::TYPE
    }

    fn destroy(&mut self) {
        self.params = None;
    }
}

impl ComponentKind for MeshComponent {
    const TYPE: ComponentType = ComponentType::new("MeshComponent");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{LightKind, PrimitiveShape};

    #[test]
    fn test_parse_each_kind() {
        let light = MeshParams::parse("light", "(type: spot)").unwrap();
        assert_eq!(light, MeshParams::Light(LightParams::new(LightKind::Spot)));

        let primitive = MeshParams::parse("primitive", "(type: plane, width: Some(4.0))").unwrap();
        match primitive {
            MeshParams::Primitive(params) => {
                assert_eq!(params.shape, PrimitiveShape::Plane);
                assert_eq!(params.width, Some(4.0));
            }
            other => panic!("expected primitive, got {other:?}"),
        }

        let model = MeshParams::parse("model", r#"(url: "robot.ron")"#).unwrap();
        assert_eq!(model, MeshParams::Model(ModelParams::new("robot.ron")));
    }

    #[test]
    fn test_unknown_kind() {
        let result = MeshParams::parse("camera", "()");
        assert!(matches!(result, Err(EcsError::UnknownKind(kind)) if kind == "camera"));
    }

    #[test]
    fn test_malformed_body() {
        let result = MeshParams::parse("light", "(type: laser)");
        assert!(matches!(result, Err(EcsError::InvalidParams(_))));
    }

    #[test]
    fn test_destroy_clears_params() {
        let mut mesh = MeshComponent::new(MeshParams::Model(ModelParams::new("a.ron")));
        mesh.destroy();
        assert!(mesh.params().is_none());
    }
}
