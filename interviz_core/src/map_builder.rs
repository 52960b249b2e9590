//! Static road-network meshes.
//!
//! Runs once per received map: every styled way becomes a ribbon, every
//! pre-triangulated lane (and the region) becomes a flat road surface.

use crate::geometry::{flat_triangles, ribbon};
use crate::map::MapPayload;
use crate::scene::{Geometry, Layer, Material, NodeHandle, SceneError, SceneGraph, SceneNode, Transform};
use crate::style::{way_rendering, Rgb, WayRendering};
use nalgebra::Point3;
use tracing::{debug, warn};

/// Height of line markings above the road surface.
pub const LINE_HEIGHT: f32 = 0.1;

/// Height of lane and region surfaces.
pub const SURFACE_HEIGHT: f32 = 0.0;

/// Height of the ground plane, just below the road.
pub const GROUND_HEIGHT: f32 = -0.2;

/// Edge length of the square ground plane.
pub const GROUND_SIZE: f32 = 10_000.0;

/// Handles of the static meshes built from one map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapMeshes {
    pub ribbons: Vec<NodeHandle>,
    pub surfaces: Vec<NodeHandle>,
    /// Ways not drawn (hidden kinds, unknown kinds, degenerate polylines)
    pub skipped: usize,
    /// Subset of `skipped` whose kind had no style
    pub unrecognized: usize,
}

/// Builds the static scene from a map payload.
#[derive(Debug, Clone)]
pub struct MapMeshBuilder {
    pub line_height: f32,
    pub surface_height: f32,
    pub road_color: Rgb,
}

impl Default for MapMeshBuilder {
    fn default() -> Self {
        Self {
            line_height: LINE_HEIGHT,
            surface_height: SURFACE_HEIGHT,
            road_color: Rgb::ROAD,
        }
    }
}

impl MapMeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds all road meshes for `map` to `scene`.
    pub fn build<S: SceneGraph + ?Sized>(
        &self,
        map: &MapPayload,
        scene: &mut S,
    ) -> Result<MapMeshes, SceneError> {
        let mut meshes = MapMeshes::default();

        for (i, way) in map.ways.iter().enumerate() {
            let style = match way_rendering(&way.kind) {
                WayRendering::Ribbon(style) => style,
                WayRendering::Hidden => {
                    meshes.skipped += 1;
                    continue;
                }
                WayRendering::Unrecognized => {
                    warn!(kind = %way.kind, way = i, "no style for way kind, not rendered");
                    meshes.skipped += 1;
                    meshes.unrecognized += 1;
                    continue;
                }
            };

            let mesh = ribbon(&way.points, style.thickness, self.line_height);
            if mesh.is_empty() {
                debug!(kind = %way.kind, way = i, points = way.points.len(), "degenerate way");
                meshes.skipped += 1;
                continue;
            }

            let handle = scene.add(SceneNode {
                name: format!("way_{}_{}", i, way.kind),
                layer: Layer::Marking,
                geometry: Geometry::Mesh(mesh),
                material: Material::standard(style.color).double_sided(),
                transform: Transform::default(),
            })?;
            meshes.ribbons.push(handle);
        }

        let lanes = map.triangulated_lanes.iter().enumerate().map(|(i, t)| (format!("lane_{}", i), t));
        let region = std::iter::once(("region".to_string(), &map.triangulated_region));

        for (name, triangles) in lanes.chain(region) {
            if triangles.is_empty() {
                continue;
            }
            let handle = scene.add(SceneNode {
                name,
                layer: Layer::Surface,
                geometry: Geometry::Mesh(flat_triangles(triangles, self.surface_height)),
                material: Material::standard(self.road_color),
                transform: Transform::default(),
            })?;
            meshes.surfaces.push(handle);
        }

        debug!(
            ribbons = meshes.ribbons.len(),
            surfaces = meshes.surfaces.len(),
            skipped = meshes.skipped,
            "map meshes built"
        );
        Ok(meshes)
    }
}

/// The grass plane under the road network.
pub fn ground_plane() -> SceneNode {
    SceneNode {
        name: "ground".to_string(),
        layer: Layer::Ground,
        geometry: Geometry::Plane { width: GROUND_SIZE, depth: GROUND_SIZE },
        material: Material::standard(Rgb::GRASS).double_sided(),
        transform: Transform::at(Point3::new(0.0, GROUND_HEIGHT, 0.0)),
    }
}
