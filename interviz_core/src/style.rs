//! Colors and per-kind styling for the road network and agents.

use crate::frame::TrackId;
use crate::map::WayKind;
use serde::{Deserialize, Serialize};

/// An 8-bit RGB color. Serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb::from_hex(0xffffff);
    pub const NEAR_BLACK: Rgb = Rgb::from_hex(0x111111);
    pub const GRAY: Rgb = Rgb::from_hex(0x999999);
    pub const ROAD: Rgb = Rgb::from_hex(0x303030);
    pub const SKY: Rgb = Rgb::from_hex(0x9ed8ff);
    pub const GRASS: Rgb = Rgb::from_hex(0x4f7942);

    /// Builds a color from a `0xRRGGBB` literal.
    pub const fn from_hex(hex: u32) -> Self {
        Self(
            ((hex >> 16) & 0xff) as u8,
            ((hex >> 8) & 0xff) as u8,
            (hex & 0xff) as u8,
        )
    }

    pub fn to_hex(self) -> u32 {
        (self.0 as u32) << 16 | (self.1 as u32) << 8 | self.2 as u32
    }

    /// RGBA bytes with the given opacity in `[0, 1]`.
    pub fn with_alpha(self, opacity: f32) -> [u8; 4] {
        let a = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        [self.0, self.1, self.2, a]
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:06x}", self.to_hex())
    }
}

/// Pastel palette used when the server does not assign an agent color.
pub const AGENT_PALETTE: [Rgb; 10] = [
    Rgb(161, 201, 244),
    Rgb(255, 180, 130),
    Rgb(141, 229, 161),
    Rgb(255, 159, 155),
    Rgb(208, 187, 255),
    Rgb(222, 187, 155),
    Rgb(250, 176, 228),
    Rgb(207, 207, 207),
    Rgb(255, 254, 163),
    Rgb(185, 242, 240),
];

/// Stable palette color for a track.
pub fn palette_color(track_id: TrackId) -> Rgb {
    AGENT_PALETTE[(track_id % AGENT_PALETTE.len() as u64) as usize]
}

/// Thickness and color of a rendered way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WayStyle {
    /// Ribbon width in meters
    pub thickness: f64,
    pub color: Rgb,
}

/// How a way kind shows up in the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WayRendering {
    /// Triangulated into a flat ribbon
    Ribbon(WayStyle),
    /// Known kind that is deliberately not drawn
    Hidden,
    /// Kind the client has no style for
    Unrecognized,
}

/// Styling table for way kinds.
pub fn way_rendering(kind: &WayKind) -> WayRendering {
    let ribbon = |thickness, color| WayRendering::Ribbon(WayStyle { thickness, color });
    match kind {
        WayKind::StopLine => ribbon(1.0, Rgb::WHITE),
        WayKind::ThickLine => ribbon(0.1, Rgb::WHITE),
        WayKind::SolidLine => ribbon(0.05, Rgb::WHITE),
        WayKind::RoadBorder => ribbon(0.1, Rgb::WHITE),
        WayKind::CurbStone => ribbon(0.1, Rgb::NEAR_BLACK),
        WayKind::PedestrianMarking => ribbon(1.0, Rgb::GRAY),
        WayKind::DashedLine => ribbon(0.1, Rgb::GRAY),
        WayKind::Virtual | WayKind::GuardRail | WayKind::TrafficSign => WayRendering::Hidden,
        WayKind::Unrecognized(_) => WayRendering::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(Rgb::from_hex(0x303030), Rgb(0x30, 0x30, 0x30));
        assert_eq!(Rgb::SKY.to_hex(), 0x9ed8ff);
        assert_eq!(Rgb::NEAR_BLACK.to_string(), "#111111");
    }

    #[test]
    fn test_alpha_scaling() {
        assert_eq!(Rgb(255, 0, 0).with_alpha(0.8), [255, 0, 0, 204]);
        assert_eq!(Rgb(1, 2, 3).with_alpha(2.0)[3], 255);
    }

    #[test]
    fn test_way_styles_match_table() {
        let table = [
            (WayKind::StopLine, 1.0, Rgb::WHITE),
            (WayKind::ThickLine, 0.1, Rgb::WHITE),
            (WayKind::SolidLine, 0.05, Rgb::WHITE),
            (WayKind::RoadBorder, 0.1, Rgb::WHITE),
            (WayKind::CurbStone, 0.1, Rgb::NEAR_BLACK),
            (WayKind::PedestrianMarking, 1.0, Rgb::GRAY),
            (WayKind::DashedLine, 0.1, Rgb::GRAY),
        ];
        for (kind, thickness, color) in table {
            assert_eq!(
                way_rendering(&kind),
                WayRendering::Ribbon(WayStyle { thickness, color }),
                "{}",
                kind
            );
        }
    }

    #[test]
    fn test_hidden_and_unknown_kinds() {
        assert_eq!(way_rendering(&WayKind::Virtual), WayRendering::Hidden);
        assert_eq!(way_rendering(&WayKind::GuardRail), WayRendering::Hidden);
        assert_eq!(
            way_rendering(&WayKind::Unrecognized("Zebra".into())),
            WayRendering::Unrecognized
        );
    }

    #[test]
    fn test_palette_is_stable() {
        assert_eq!(palette_color(0), AGENT_PALETTE[0]);
        assert_eq!(palette_color(13), AGENT_PALETTE[3]);
        assert_eq!(palette_color(13), palette_color(13));
    }
}
