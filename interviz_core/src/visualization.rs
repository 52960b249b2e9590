//! Rerun.io scene backend
//!
//! Streams the retained scene to a Rerun viewer:
//! - road ribbons and lane surfaces as static meshes
//! - agents as boxes / cylinder meshes with a per-node transform
//! - one `tick` timeline step per presented frame
//!
//! Enable with the `visualization` feature flag.

use crate::geometry::{cylinder, plane, TriangleMesh};
use crate::scene::{
    Camera, Geometry, Layer, Light, Material, MaterialKind, NodeHandle, SceneEnvironment, SceneError,
    SceneGraph, SceneNode, Transform,
};
use rerun::{RecordingStream, RecordingStreamBuilder};
use std::collections::HashMap;

/// Segments used when a cylinder is sent as a mesh.
const CYLINDER_SEGMENTS: u32 = 16;

/// Rerun-based scene graph.
pub struct RerunScene {
    rec: RecordingStream,
    /// Entity path of every live node
    paths: HashMap<NodeHandle, String>,
    next_id: u64,
    tick: i64,
}

impl RerunScene {
    /// Create a scene that spawns the Rerun viewer
    pub fn spawn(app_id: &str) -> Result<Self, SceneError> {
        let rec = RecordingStreamBuilder::new(app_id)
            .spawn()
            .map_err(SceneError::backend)?;
        Self::with_stream(rec)
    }

    /// Create a scene that saves to an `.rrd` file
    pub fn save(app_id: &str, path: &str) -> Result<Self, SceneError> {
        let rec = RecordingStreamBuilder::new(app_id)
            .save(path)
            .map_err(SceneError::backend)?;
        Self::with_stream(rec)
    }

    fn with_stream(rec: RecordingStream) -> Result<Self, SceneError> {
        rec.log_static("world", &rerun::ViewCoordinates::RIGHT_HAND_Y_UP())
            .map_err(SceneError::backend)?;

        Ok(Self {
            rec,
            paths: HashMap::new(),
            next_id: 0,
            tick: 0,
        })
    }

    fn log_mesh(&self, path: &str, mesh: &TriangleMesh, material: &Material, is_static: bool) -> Result<(), SceneError> {
        let color = material.color.with_alpha(material.opacity);
        let colors = vec![rerun::Color::from_unmultiplied_rgba(color[0], color[1], color[2], color[3]); mesh.vertex_count()];

        // Normals come from the front faces only; back faces would cancel them
        let normals = mesh.vertex_normals();
        let triangles = if material.double_sided {
            mesh.with_back_faces().triangles
        } else {
            mesh.triangles.clone()
        };

        let mut archetype = rerun::Mesh3D::new(mesh.positions())
            .with_triangle_indices(triangles)
            .with_vertex_colors(colors);
        if material.kind == MaterialKind::Standard {
            archetype = archetype.with_vertex_normals(normals);
        }

        let result = if is_static {
            self.rec.log_static(path, &archetype)
        } else {
            self.rec.log(path, &archetype)
        };
        result.map_err(SceneError::backend)
    }

    fn log_transform(&self, path: &str, transform: &Transform) -> Result<(), SceneError> {
        let p = transform.position;
        self.rec
            .log(
                path,
                &rerun::Transform3D::from_translation_rotation(
                    [p.x, p.y, p.z],
                    rerun::RotationAxisAngle::new([0.0, 1.0, 0.0], rerun::Angle::from_radians(transform.yaw)),
                ),
            )
            .map_err(SceneError::backend)
    }
}

impl SceneGraph for RerunScene {
    fn set_environment(&mut self, environment: &SceneEnvironment) -> Result<(), SceneError> {
        // Rerun has no fog or lights; record them so the recording is self-describing
        let mut lines = vec![format!("background {}", environment.background)];
        if let Some(fog) = environment.fog {
            lines.push(format!("fog {} density {}", fog.color, fog.density));
        }
        for light in &environment.lights {
            lines.push(match light {
                Light::Hemisphere { sky, ground, intensity } => {
                    format!("hemisphere light {} / {} x{}", sky, ground, intensity)
                }
                Light::Directional { color, intensity, position } => {
                    format!("directional light {} x{} at {:?}", color, intensity, position)
                }
            });
        }

        self.rec
            .log_static("logs/environment", &rerun::TextLog::new(lines.join("\n")))
            .map_err(SceneError::backend)
    }

    fn add(&mut self, node: SceneNode) -> Result<NodeHandle, SceneError> {
        let handle = NodeHandle(self.next_id);
        self.next_id += 1;

        let path = format!("world/{}/{}", node.layer.name(), node.name);
        let material = &node.material;
        let is_static = node.layer != Layer::Agent;

        match &node.geometry {
            Geometry::Mesh(mesh) => self.log_mesh(&path, mesh, material, is_static)?,
            Geometry::Plane { width, depth } => self.log_mesh(&path, &plane(*width, *depth), material, is_static)?,
            Geometry::Cylinder { radius, height } => {
                self.log_mesh(&path, &cylinder(*radius, *height, CYLINDER_SEGMENTS), material, is_static)?
            }
            Geometry::Box { size } => {
                let color = material.color.with_alpha(material.opacity);
                self.rec
                    .log(
                        path.as_str(),
                        &rerun::Boxes3D::from_centers_and_sizes([[0.0, 0.0, 0.0]], [[size.x, size.y, size.z]])
                            .with_colors([rerun::Color::from_unmultiplied_rgba(color[0], color[1], color[2], color[3])])
                            .with_labels([node.name.as_str()]),
                    )
                    .map_err(SceneError::backend)?;
            }
        }

        self.log_transform(&path, &node.transform)?;
        self.paths.insert(handle, path);
        Ok(handle)
    }

    fn set_transform(&mut self, handle: NodeHandle, transform: Transform) -> Result<(), SceneError> {
        let path = self.paths.get(&handle).ok_or(SceneError::UnknownNode(handle))?;
        self.log_transform(path, &transform)
    }

    fn remove(&mut self, handle: NodeHandle) -> Result<(), SceneError> {
        let path = self.paths.remove(&handle).ok_or(SceneError::UnknownNode(handle))?;
        self.rec
            .log(path.as_str(), &rerun::Clear::recursive())
            .map_err(SceneError::backend)
    }

    fn present(&mut self, camera: &Camera) -> Result<(), SceneError> {
        self.tick += 1;
        self.rec.set_time_sequence("tick", self.tick);

        // Camera pose on the first tick, then every 600 ticks
        if self.tick == 1 || self.tick % 600 == 0 {
            let (p, t) = (camera.position, camera.target);
            self.rec
                .log(
                    "logs/camera",
                    &rerun::TextLog::new(format!(
                        "camera at ({:.1}, {:.1}, {:.1}) looking at ({:.1}, {:.1}, {:.1}), aspect {:.2}",
                        p.x, p.y, p.z, t.x, t.y, t.z, camera.aspect
                    )),
                )
                .map_err(SceneError::backend)?;
        }
        Ok(())
    }
}
