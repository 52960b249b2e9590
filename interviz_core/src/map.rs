//! Static road-network payload.

use serde::{Deserialize, Serialize};

/// A 2D map coordinate `[x, y]` in meters.
pub type Point2 = [f64; 2];

/// A pre-triangulated surface triangle.
pub type Triangle2 = [Point2; 3];

/// Class of road line feature.
///
/// Kind names arrive as strings; anything the client does not know lands
/// in `Unrecognized` so it can be reported instead of vanishing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WayKind {
    SolidLine,
    ThickLine,
    DashedLine,
    GuardRail,
    CurbStone,
    Virtual,
    PedestrianMarking,
    TrafficSign,
    StopLine,
    RoadBorder,
    Unrecognized(String),
}

impl WayKind {
    /// Wire name of the kind.
    pub fn name(&self) -> &str {
        match self {
            Self::SolidLine => "SolidLine",
            Self::ThickLine => "ThickLine",
            Self::DashedLine => "DashedLine",
            Self::GuardRail => "GuardRail",
            Self::CurbStone => "CurbStone",
            Self::Virtual => "Virtual",
            Self::PedestrianMarking => "PedestrianMarking",
            Self::TrafficSign => "TrafficSign",
            Self::StopLine => "StopLine",
            Self::RoadBorder => "RoadBorder",
            Self::Unrecognized(name) => name,
        }
    }
}

impl From<String> for WayKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "SolidLine" => Self::SolidLine,
            "ThickLine" => Self::ThickLine,
            "DashedLine" => Self::DashedLine,
            "GuardRail" => Self::GuardRail,
            "CurbStone" => Self::CurbStone,
            "Virtual" => Self::Virtual,
            "PedestrianMarking" => Self::PedestrianMarking,
            "TrafficSign" => Self::TrafficSign,
            "StopLine" => Self::StopLine,
            "RoadBorder" => Self::RoadBorder,
            _ => Self::Unrecognized(name),
        }
    }
}

impl From<WayKind> for String {
    fn from(kind: WayKind) -> Self {
        match kind {
            WayKind::Unrecognized(name) => name,
            other => other.name().to_string(),
        }
    }
}

impl std::fmt::Display for WayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A polyline road feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Way {
    pub kind: WayKind,
    pub points: Vec<Point2>,
}

/// Axis-aligned extent of a map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point2,
    pub max: Point2,
}

impl Bounds {
    pub fn center(&self) -> Point2 {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        ]
    }

    fn include(&mut self, p: Point2) {
        self.min = [self.min[0].min(p[0]), self.min[1].min(p[1])];
        self.max = [self.max[0].max(p[0]), self.max[1].max(p[1])];
    }
}

/// Static road description, sent once per connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapPayload {
    #[serde(default)]
    pub ways: Vec<Way>,

    /// One triangle list per lane
    #[serde(default)]
    pub triangulated_lanes: Vec<Vec<Triangle2>>,

    /// Drivable region outside of lanes
    #[serde(default)]
    pub triangulated_region: Vec<Triangle2>,
}

impl MapPayload {
    /// Bounds over every way point and surface vertex, `None` for an empty map.
    pub fn bounds(&self) -> Option<Bounds> {
        let way_points = self.ways.iter().flat_map(|w| w.points.iter().copied());
        let lane_points = self
            .triangulated_lanes
            .iter()
            .flatten()
            .chain(self.triangulated_region.iter())
            .flat_map(|t| t.iter().copied());

        let mut points = way_points.chain(lane_points).filter(|p| p[0].is_finite() && p[1].is_finite());
        let first = points.next()?;
        let mut bounds = Bounds { min: first, max: first };
        for p in points {
            bounds.include(p);
        }
        Some(bounds)
    }
}
