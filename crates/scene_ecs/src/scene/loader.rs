//! Asynchronous model loading
//!
//! Models are described in RON and resolved relative to an asset root:
//!
//! ```ron
//! (
//!     name: "robot",
//!     nodes: [
//!         (name: "body", primitive: Some((type: box, height: Some(2.0)))),
//!         (name: "head", primitive: Some((type: sphere)), position: (0.0, 1.5, 0.0)),
//!     ],
//!     animations: [(name: "Wave", duration: 1.2)],
//! )
//! ```

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::factory::{create_primitive_mesh, PrimitiveParams};
use super::node::{AnimationClip, NodeKind, SceneHandle, SceneNode};
use crate::foundation::math::{Transform, Vec3};

/// Model loading errors
#[derive(Error, Debug)]
pub enum LoadError {
    /// Nothing at the requested location
    #[error("Model not found: {0}")]
    NotFound(String),

    /// IO error while reading
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Description could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A loaded model: its root node and animation clips
#[derive(Debug, Clone)]
pub struct LoadedModel {
    /// Root node
    pub scene: SceneHandle,
    /// Animation clips found in the model
    pub animations: Vec<AnimationClip>,
}

/// Future returned by [`ModelLoader::load_model`]
pub type LoadFuture = Pin<Box<dyn Future<Output = Result<LoadedModel, LoadError>>>>;

/// Source of model scene graphs
pub trait ModelLoader {
    /// Start loading the model at `url`
    fn load_model(&self, url: &str) -> LoadFuture;
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// Serialized node of a model description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    /// Node name
    pub name: String,
    /// Geometry; `None` makes a group node
    #[serde(default)]
    pub primitive: Option<PrimitiveParams>,
    /// Local position
    #[serde(default)]
    pub position: [f32; 3],
    /// Local scale
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    /// Child nodes
    #[serde(default)]
    pub children: Vec<NodeDescription>,
}

impl NodeDescription {
    fn build(&self) -> SceneHandle {
        let node = match &self.primitive {
            Some(params) => create_primitive_mesh(params),
            None => SceneHandle::group(),
        };
        node.set_name(self.name.as_str());
        node.set_transform(Transform {
            position: Vec3::from(self.position),
            scale: Vec3::from(self.scale),
            ..Transform::identity()
        });
        for child in &self.children {
            node.add_child(child.build());
        }
        node
    }
}

/// Serialized model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    /// Model name, used for the root node
    pub name: String,
    /// Top-level nodes
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    /// Animation clips
    #[serde(default)]
    pub animations: Vec<AnimationClip>,
}

impl ModelDescription {
    /// Parse a RON description
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        ron::from_str(text).map_err(|e| LoadError::Parse(e.to_string()))
    }

    /// Build the scene graph
    pub fn build(&self) -> LoadedModel {
        let root = SceneHandle::new(SceneNode::new(self.name.as_str(), NodeKind::Group));
        for node in &self.nodes {
            root.add_child(node.build());
        }
        root.set_animations(self.animations.clone());
        LoadedModel {
            scene: root,
            animations: self.animations.clone(),
        }
    }
}

/// Loads RON model descriptions from a directory
///
/// No caching and no retry: every call reads the file again.
#[derive(Debug, Clone)]
pub struct RonModelLoader {
    root: PathBuf,
}

impl RonModelLoader {
    /// Create a loader resolving urls against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Asset root
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ModelLoader for RonModelLoader {
    fn load_model(&self, url: &str) -> LoadFuture {
        let path = self.root.join(url);
        let url = url.to_string();
        Box::pin(async move {
            log::debug!("Loading model '{}' from {}", url, path.display());
            let text = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => LoadError::NotFound(url.clone()),
                _ => LoadError::Io(e),
            })?;
            let model = ModelDescription::parse(&text)?.build();
            log::info!("Loaded model '{}'", url);
            Ok(model)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ROBOT: &str = r#"(
        name: "robot",
        nodes: [
            (name: "body", primitive: Some((type: box))),
            (name: "head", primitive: Some((type: sphere)), position: (0.0, 1.5, 0.0)),
        ],
        animations: [(name: "Wave", duration: 1.2)],
    )"#;

    fn asset_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scene_ecs_loader_{}_{tag}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_build_from_description() {
        let model = ModelDescription::parse(ROBOT).unwrap().build();

        assert_eq!(model.scene.name(), "robot");
        assert_eq!(model.animations.len(), 1);
        assert_eq!(model.scene.animation("Wave").map(|c| c.duration), Some(1.2));

        let children = model.scene.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].name(), "head");
        assert!(children[1].is_renderable());
        assert_eq!(children[1].transform().position, Vec3::new(0.0, 1.5, 0.0));
    }

    #[test]
    fn test_loads_from_asset_root() {
        let dir = asset_dir("ok");
        fs::write(dir.join("robot.ron"), ROBOT).unwrap();

        let loader = RonModelLoader::new(&dir);
        let model = pollster::block_on(loader.load_model("robot.ron")).unwrap();
        assert_eq!(model.scene.children().len(), 2);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let loader = RonModelLoader::new(asset_dir("missing"));
        let result = pollster::block_on(loader.load_model("nope.ron"));
        assert!(matches!(result, Err(LoadError::NotFound(url)) if url == "nope.ron"));
    }

    #[test]
    fn test_malformed_description_is_parse_error() {
        let dir = asset_dir("bad");
        fs::write(dir.join("bad.ron"), "(name: ").unwrap();

        let loader = RonModelLoader::new(&dir);
        let result = pollster::block_on(loader.load_model("bad.ron"));
        assert!(matches!(result, Err(LoadError::Parse(_))));

        fs::remove_dir_all(dir).ok();
    }
}
