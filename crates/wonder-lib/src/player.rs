use std::fmt::Display;

use ecolor::Color32;
use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// The fixed palette a player can pick from.
///
/// Colors are serialized as the hex strings the button firmware expects,
/// e.g. `"#FF1493"` for [`PlayerColor::Pink`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum PlayerColor {
    #[serde(rename = "#FF0000")]
    Red,
    #[serde(rename = "#0000FF")]
    Blue,
    #[serde(rename = "#00FF00")]
    Green,
    #[serde(rename = "#FF1493")]
    Pink,
    #[serde(rename = "#FFA500")]
    Orange,
    #[serde(rename = "#800080")]
    Purple,
    #[serde(rename = "#00FFFF")]
    Cyan,
    #[serde(rename = "#FFFFFF")]
    White,
}

impl PlayerColor {
    pub const ALL: [PlayerColor; 8] = [
        Self::Red,
        Self::Blue,
        Self::Green,
        Self::Pink,
        Self::Orange,
        Self::Purple,
        Self::Cyan,
        Self::White,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Blue => "Blue",
            Self::Green => "Green",
            Self::Pink => "Pink",
            Self::Orange => "Orange",
            Self::Purple => "Purple",
            Self::Cyan => "Cyan",
            Self::White => "White",
        }
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Red => (0xFF, 0x00, 0x00),
            Self::Blue => (0x00, 0x00, 0xFF),
            Self::Green => (0x00, 0xFF, 0x00),
            Self::Pink => (0xFF, 0x14, 0x93),
            Self::Orange => (0xFF, 0xA5, 0x00),
            Self::Purple => (0x80, 0x00, 0x80),
            Self::Cyan => (0x00, 0xFF, 0xFF),
            Self::White => (0xFF, 0xFF, 0xFF),
        }
    }

    pub fn color(self) -> Color32 {
        let (r, g, b) = self.rgb();
        Color32::from_rgb(r, g, b)
    }

    /// Color for text and icons drawn on top of this color.
    pub fn contrast(self) -> Color32 {
        match self {
            Self::Cyan | Self::White => Color32::BLACK,
            _ => Color32::WHITE,
        }
    }
}

impl Display for PlayerColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: PlayerColor,
    pub turn_order: u32,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>, color: PlayerColor) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color,
            turn_order: 0,
        }
    }
}
