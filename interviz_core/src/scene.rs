//! Retained-mode scene graph abstraction.
//!
//! The client never talks to a renderer directly. It adds nodes, moves
//! them, removes them, and asks for a frame to be presented through a
//! [`Camera`]. [`RetainedScene`] keeps everything in memory (headless runs
//! and tests); the Rerun backend lives in `visualization`.

use crate::geometry::TriangleMesh;
use crate::map::Point2;
use crate::style::Rgb;
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use thiserror::Error;

/// Opaque identifier of a node owned by a scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u64);

impl std::fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Shape of a node in its local frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Arbitrary triangles, already in world coordinates
    Mesh(TriangleMesh),
    /// Box with full edge lengths `(x, y, z)`
    Box { size: Vector3<f32> },
    /// Upright cylinder
    Cylinder { radius: f32, height: f32 },
    /// Horizontal rectangle
    Plane { width: f32, depth: f32 },
}

/// Shading model, mirroring the common retained-mode material set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Unlit flat color
    Basic,
    /// Lit, physically based
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub color: Rgb,
    /// 1.0 is fully opaque
    pub opacity: f32,
    pub double_sided: bool,
}

impl Material {
    pub fn basic(color: Rgb) -> Self {
        Self {
            kind: MaterialKind::Basic,
            color,
            opacity: 1.0,
            double_sided: false,
        }
    }

    pub fn standard(color: Rgb) -> Self {
        Self {
            kind: MaterialKind::Standard,
            ..Self::basic(color)
        }
    }

    pub fn transparent(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.double_sided = true;
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

/// Placement of a node: translation plus rotation about the up (Y) axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Point3<f32>,
    /// Radians about +Y
    pub yaw: f32,
}

impl Transform {
    pub fn at(position: Point3<f32>) -> Self {
        Self { position, yaw: 0.0 }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Point3::origin())
    }
}

/// Draw-order group a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Ground,
    Surface,
    Marking,
    Agent,
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ground => "ground",
            Self::Surface => "surfaces",
            Self::Marking => "markings",
            Self::Agent => "agents",
        }
    }
}

/// Everything needed to create a node.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub layer: Layer,
    pub geometry: Geometry,
    pub material: Material,
    pub transform: Transform,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Hemisphere { sky: Rgb, ground: Rgb, intensity: f32 },
    Directional { color: Rgb, intensity: f32, position: Point3<f32> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Rgb,
    /// Exponential-squared density
    pub density: f32,
}

/// Scene-wide settings applied once per session.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneEnvironment {
    pub background: Rgb,
    pub fog: Option<Fog>,
    pub lights: Vec<Light>,
}

impl Default for SceneEnvironment {
    fn default() -> Self {
        Self {
            background: Rgb::SKY,
            fog: Some(Fog { color: Rgb::SKY, density: 0.00055 }),
            lights: vec![
                Light::Hemisphere { sky: Rgb::WHITE, ground: Rgb::WHITE, intensity: 2.0 },
                Light::Directional {
                    color: Rgb::WHITE,
                    intensity: 0.5,
                    position: Point3::new(-1.0, 1000.0, 1000.0),
                },
            ],
        }
    }
}

/// Perspective camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    /// Vertical field of view in degrees
    pub fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3::new(50.0, 50.0, 50.0),
            target: Point3::origin(),
            fov_deg: 75.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Adapts the aspect ratio to a new viewport size. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Re-aims the camera at a map point, keeping its offset to the target.
    pub fn look_at_map(&mut self, point: Point2) {
        let offset = self.position - self.target;
        self.target = Point3::new(point[0] as f32, 0.0, point[1] as f32);
        self.position = self.target + offset;
    }
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("unknown scene node {0}")]
    UnknownNode(NodeHandle),

    #[error("render backend error: {0}")]
    Backend(String),
}

impl SceneError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// A retained-mode renderer.
///
/// Implementations own the nodes; the caller only keeps handles.
pub trait SceneGraph {
    /// Applies background, fog and lights.
    fn set_environment(&mut self, environment: &SceneEnvironment) -> Result<(), SceneError>;

    /// Adds a node and returns its handle.
    fn add(&mut self, node: SceneNode) -> Result<NodeHandle, SceneError>;

    /// Moves an existing node. Geometry and material are untouched.
    fn set_transform(&mut self, handle: NodeHandle, transform: Transform) -> Result<(), SceneError>;

    /// Removes a node from the scene.
    fn remove(&mut self, handle: NodeHandle) -> Result<(), SceneError>;

    /// Presents the current scene as seen through `camera`.
    fn present(&mut self, camera: &Camera) -> Result<(), SceneError>;
}

/// In-memory scene graph.
#[derive(Debug, Default)]
pub struct RetainedScene {
    nodes: HashMap<NodeHandle, SceneNode>,
    next_id: u64,
    environment: Option<SceneEnvironment>,
    presented: u64,
    last_camera: Option<Camera>,
}

impl RetainedScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&SceneNode> {
        self.nodes.get(&handle)
    }

    /// Live nodes in one layer.
    pub fn nodes_in(&self, layer: Layer) -> impl Iterator<Item = (NodeHandle, &SceneNode)> {
        self.nodes
            .iter()
            .filter(move |(_, n)| n.layer == layer)
            .map(|(h, n)| (*h, n))
    }

    pub fn count_in(&self, layer: Layer) -> usize {
        self.nodes_in(layer).count()
    }

    pub fn environment(&self) -> Option<&SceneEnvironment> {
        self.environment.as_ref()
    }

    /// How many times `present` was called.
    pub fn presented_frames(&self) -> u64 {
        self.presented
    }

    pub fn last_camera(&self) -> Option<&Camera> {
        self.last_camera.as_ref()
    }
}

impl SceneGraph for RetainedScene {
    fn set_environment(&mut self, environment: &SceneEnvironment) -> Result<(), SceneError> {
        self.environment = Some(environment.clone());
        Ok(())
    }

    fn add(&mut self, node: SceneNode) -> Result<NodeHandle, SceneError> {
        let handle = NodeHandle(self.next_id);
        self.next_id += 1;
        self.nodes.insert(handle, node);
        Ok(handle)
    }

    fn set_transform(&mut self, handle: NodeHandle, transform: Transform) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(&handle).ok_or(SceneError::UnknownNode(handle))?;
        node.transform = transform;
        Ok(())
    }

    fn remove(&mut self, handle: NodeHandle) -> Result<(), SceneError> {
        self.nodes
            .remove(&handle)
            .map(|_| ())
            .ok_or(SceneError::UnknownNode(handle))
    }

    fn present(&mut self, camera: &Camera) -> Result<(), SceneError> {
        self.presented += 1;
        self.last_camera = Some(*camera);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(name: &str) -> SceneNode {
        SceneNode {
            name: name.to_string(),
            layer: Layer::Marking,
            geometry: Geometry::Plane { width: 1.0, depth: 1.0 },
            material: Material::standard(Rgb::WHITE),
            transform: Transform::default(),
        }
    }

    #[test]
    fn test_retained_scene_lifecycle() {
        let mut scene = RetainedScene::new();
        let a = scene.add(marker("a")).unwrap();
        let b = scene.add(marker("b")).unwrap();
        assert_ne!(a, b);
        assert_eq!(scene.len(), 2);

        let moved = Transform { position: Point3::new(1.0, 2.0, 3.0), yaw: 0.5 };
        scene.set_transform(a, moved).unwrap();
        assert_eq!(scene.node(a).unwrap().transform, moved);

        scene.remove(a).unwrap();
        assert_eq!(scene.len(), 1);
        assert!(matches!(scene.remove(a), Err(SceneError::UnknownNode(h)) if h == a));
        assert!(scene.set_transform(a, moved).is_err());
    }

    #[test]
    fn test_handles_are_not_reused() {
        let mut scene = RetainedScene::new();
        let a = scene.add(marker("a")).unwrap();
        scene.remove(a).unwrap();
        let b = scene.add(marker("b")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_present_records_camera() {
        let mut scene = RetainedScene::new();
        let mut camera = Camera::default();
        camera.resize(800, 400);
        scene.present(&camera).unwrap();
        scene.present(&camera).unwrap();

        assert_eq!(scene.presented_frames(), 2);
        assert_eq!(scene.last_camera().unwrap().aspect, 2.0);
    }

    #[test]
    fn test_camera_resize_ignores_zero() {
        let mut camera = Camera::default();
        let before = camera.aspect;
        camera.resize(0, 600);
        assert_eq!(camera.aspect, before);
    }

    #[test]
    fn test_camera_look_at_map_keeps_offset() {
        let mut camera = Camera::default();
        camera.look_at_map([100.0, -20.0]);
        assert_eq!(camera.target, Point3::new(100.0, 0.0, -20.0));
        assert_eq!(camera.position, Point3::new(150.0, 50.0, 30.0));
    }

    #[test]
    fn test_default_environment() {
        let env = SceneEnvironment::default();
        assert_eq!(env.background, Rgb::SKY);
        assert_eq!(env.lights.len(), 2);
    }

    #[test]
    fn test_material_builders() {
        let m = Material::basic(Rgb::GRAY).transparent(0.8).double_sided();
        assert_eq!(m.kind, MaterialKind::Basic);
        assert!(m.is_transparent());
        assert!(m.double_sided);
    }
}
