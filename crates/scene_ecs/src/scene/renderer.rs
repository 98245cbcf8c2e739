//! Renderer contract and the headless implementation

use crate::config::ViewportSettings;
use crate::ecs::AsAny;
use crate::foundation::math::{Mat4, Vec3};

use super::node::{NodeKind, SceneHandle};

/// Result of a hit-test
#[derive(Debug, Clone)]
pub struct PickHit {
    /// Closest renderable node under the pointer
    pub node: SceneHandle,
    /// Distance from the camera along the pick ray
    pub distance: f32,
}

/// Rendering collaborator driven by the viewport system
pub trait SceneRenderer: AsAny {
    /// Apply viewport settings (clear color, shadows)
    fn configure(&mut self, _settings: &ViewportSettings) {}

    /// Attach a root node to the rendered scene
    fn add(&mut self, node: &SceneHandle);

    /// Detach a root node; no-op when not attached
    fn remove(&mut self, node: &SceneHandle);

    /// Whether a root node is attached
    fn contains(&self, node: &SceneHandle) -> bool;

    /// Draw one frame
    fn render(&mut self, delta: f32);

    /// Resize the output surface in pixels
    fn resize(&mut self, width: u32, height: u32);

    /// Closest renderable node among `candidates` under a pixel position
    fn pick(&self, candidates: &[SceneHandle], x: f32, y: f32) -> Option<PickHit>;
}

/// Renderer without a GPU surface
///
/// Keeps the attached roots, counts frames, and hit-tests with an
/// orthographic camera on the +Z axis looking towards the origin.
#[derive(Debug)]
pub struct HeadlessRenderer {
    roots: Vec<SceneHandle>,
    frames: u64,
    width: u32,
    height: u32,
    clear_color: u32,
    shadows: bool,
    view_extent: f32,
    camera_z: f32,
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl HeadlessRenderer {
    /// Create a renderer for a surface size in pixels
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            roots: Vec::new(),
            frames: 0,
            width: width.max(1),
            height: height.max(1),
            clear_color: ViewportSettings::default().clear_color,
            shadows: false,
            view_extent: 10.0,
            camera_z: 100.0,
        }
    }

    /// Set the half-height of the visible area in world units
    #[must_use]
    pub fn with_view_extent(mut self, view_extent: f32) -> Self {
        self.view_extent = view_extent;
        self
    }

    /// Number of frames rendered so far
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Attached roots in attach order
    pub fn roots(&self) -> &[SceneHandle] {
        &self.roots
    }

    /// Surface size in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Clear color as `0xRRGGBB`
    pub fn clear_color(&self) -> u32 {
        self.clear_color
    }

    /// Whether shadows were enabled by the viewport settings
    pub fn shadows(&self) -> bool {
        self.shadows
    }

    /// World-space point on the camera plane under a pixel position
    #[allow(clippy::cast_precision_loss)]
    pub fn unproject(&self, x: f32, y: f32) -> Vec3 {
        let width = self.width as f32;
        let height = self.height as f32;
        let ndc_x = (x / width) * 2.0 - 1.0;
        let ndc_y = -((y / height) * 2.0 - 1.0);
        let aspect = width / height;
        Vec3::new(
            ndc_x * self.view_extent * aspect,
            ndc_y * self.view_extent,
            self.camera_z,
        )
    }

    fn pick_in(
        node: &SceneHandle,
        parent: &Mat4,
        origin: Vec3,
        direction: Vec3,
        best: &mut Option<PickHit>,
    ) {
        let world = parent * node.local_matrix();
        if let NodeKind::Mesh(mesh) = node.kind() {
            let hit = mesh.bounds.transformed(&world).intersect_ray(origin, direction);
            if let Some(distance) = hit {
                if best.as_ref().map_or(true, |b| distance < b.distance) {
                    *best = Some(PickHit {
                        node: node.clone(),
                        distance,
                    });
                }
            }
        }
        for child in node.children() {
            Self::pick_in(&child, &world, origin, direction, best);
        }
    }
}

impl SceneRenderer for HeadlessRenderer {
    fn configure(&mut self, settings: &ViewportSettings) {
        self.clear_color = settings.clear_color;
        self.shadows = settings.use_shadow;
    }

    fn add(&mut self, node: &SceneHandle) {
        if !self.contains(node) {
            self.roots.push(node.clone());
        }
    }

    fn remove(&mut self, node: &SceneHandle) {
        self.roots.retain(|root| !root.ptr_eq(node));
    }

    fn contains(&self, node: &SceneHandle) -> bool {
        self.roots.iter().any(|root| root.ptr_eq(node))
    }

    fn render(&mut self, _delta: f32) {
        self.frames += 1;
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    fn pick(&self, candidates: &[SceneHandle], x: f32, y: f32) -> Option<PickHit> {
        let origin = self.unproject(x, y);
        let direction = Vec3::new(0.0, 0.0, -1.0);
        let mut best = None;
        for candidate in candidates {
            Self::pick_in(candidate, &Mat4::identity(), origin, direction, &mut best);
        }
        best
    }
}
