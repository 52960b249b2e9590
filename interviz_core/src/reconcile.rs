//! Per-frame reconciliation of the visible agent set.
//!
//! After [`VisibleAgentSet::apply`] returns, the set's keys are exactly the
//! track ids of the frame: new ids get a node, persisting ids are moved,
//! vanished ids are removed from the scene. Shape and color are fixed when
//! a node is created, even if the server later sends a different color.

use crate::frame::{Agent, AgentKind, FramePayload, TrackId};
use crate::scene::{Geometry, Layer, Material, NodeHandle, SceneError, SceneGraph, SceneNode, Transform};
use nalgebra::{Point3, Vector3};
use std::collections::{HashMap, HashSet};
use tracing::{trace, warn};

/// Height of agent centers above the road.
pub const AGENT_HEIGHT: f32 = 0.5;

/// Opacity of agent materials.
pub const AGENT_OPACITY: f32 = 0.8;

/// Vertical size of vehicle boxes.
pub const VEHICLE_BOX_HEIGHT: f32 = 1.0;

/// Radius and height of the stand-in used for non-vehicle agents.
pub const STAND_IN_RADIUS: f32 = 0.5;
pub const STAND_IN_HEIGHT: f32 = 1.0;

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Copy)]
struct VisibleAgent {
    handle: NodeHandle,
    transform: Transform,
}

/// Mapping from track id to the scene node that renders it.
#[derive(Debug, Default)]
pub struct VisibleAgentSet {
    agents: HashMap<TrackId, VisibleAgent>,
}

impl VisibleAgentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn contains(&self, track_id: TrackId) -> bool {
        self.agents.contains_key(&track_id)
    }

    pub fn handle(&self, track_id: TrackId) -> Option<NodeHandle> {
        self.agents.get(&track_id).map(|a| a.handle)
    }

    pub fn track_ids(&self) -> HashSet<TrackId> {
        self.agents.keys().copied().collect()
    }

    /// Reconciles the scene against one frame.
    pub fn apply<S: SceneGraph + ?Sized>(
        &mut self,
        frame: &FramePayload,
        scene: &mut S,
    ) -> Result<ReconcileStats, SceneError> {
        let mut stats = ReconcileStats::default();
        let present = frame.track_ids();

        for agent in &frame.agents {
            match self.agents.get_mut(&agent.track_id) {
                Some(visible) => {
                    let transform = agent_transform(agent, visible.transform.yaw);
                    scene.set_transform(visible.handle, transform)?;
                    visible.transform = transform;
                    stats.updated += 1;
                }
                None => {
                    let node = agent_node(agent);
                    let transform = node.transform;
                    let handle = scene.add(node)?;
                    self.agents.insert(agent.track_id, VisibleAgent { handle, transform });
                    stats.created += 1;
                }
            }
        }

        let gone: Vec<TrackId> = self
            .agents
            .keys()
            .filter(|id| !present.contains(id))
            .copied()
            .collect();
        for track_id in gone {
            if let Some(visible) = self.agents.remove(&track_id) {
                scene.remove(visible.handle)?;
                stats.removed += 1;
            }
        }

        trace!(
            created = stats.created,
            updated = stats.updated,
            removed = stats.removed,
            visible = self.agents.len(),
            "frame reconciled"
        );
        Ok(stats)
    }

    /// Removes every agent node, e.g. on session teardown.
    pub fn clear<S: SceneGraph + ?Sized>(&mut self, scene: &mut S) -> Result<usize, SceneError> {
        let removed = self.agents.len();
        for (_, visible) in self.agents.drain() {
            scene.remove(visible.handle)?;
        }
        Ok(removed)
    }
}

/// Node transform for an agent; without a yaw the previous heading is kept.
fn agent_transform(agent: &Agent, previous_yaw: f32) -> Transform {
    Transform {
        position: Point3::new(agent.position[0] as f32, AGENT_HEIGHT, agent.position[1] as f32),
        yaw: agent.yaw.map(|yaw| -yaw as f32).unwrap_or(previous_yaw),
    }
}

fn agent_geometry(agent: &Agent) -> Geometry {
    let stand_in = Geometry::Cylinder { radius: STAND_IN_RADIUS, height: STAND_IN_HEIGHT };
    match &agent.kind {
        AgentKind::Car | AgentKind::Truck => Geometry::Box {
            size: Vector3::new(
                agent.extent[0] as f32 / 2.0,
                VEHICLE_BOX_HEIGHT,
                agent.extent[1] as f32 / 2.0,
            ),
        },
        AgentKind::Pedestrian | AgentKind::Bicycle | AgentKind::Motorcycle => stand_in,
        AgentKind::Unrecognized(kind) => {
            warn!(track_id = agent.track_id, %kind, "unknown agent kind, using stand-in shape");
            stand_in
        }
    }
}

fn agent_node(agent: &Agent) -> SceneNode {
    SceneNode {
        name: format!("agent_{}", agent.track_id),
        layer: Layer::Agent,
        geometry: agent_geometry(agent),
        material: Material::basic(agent.color()).transparent(AGENT_OPACITY),
        transform: agent_transform(agent, 0.0),
    }
}
