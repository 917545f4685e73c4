use std::fmt::{Display, Formatter};
use std::str::FromStr;

use plotters::style::RGBAColor;
use serde::{Deserialize, Serialize};

use crate::trips::ParseKindError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Votum,
    Vmap,
    Luxury,
    Manifesto,
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub background: RGBAColor,
    pub text: RGBAColor,
    pub accent: RGBAColor,
    pub gold: RGBAColor,
    pub card_background: RGBAColor,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Votum, Theme::Vmap, Theme::Luxury, Theme::Manifesto];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Votum => "votum",
            Self::Vmap => "vmap",
            Self::Luxury => "luxury",
            Self::Manifesto => "manifesto",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Votum => "VOTUM",
            Self::Vmap => "Mapa",
            Self::Luxury => "Abundancia",
            Self::Manifesto => "Manifiesto",
        }
    }

    pub fn emotion(&self) -> &'static str {
        match self {
            Self::Votum => "Donde la intención se vuelve destino",
            Self::Vmap => "El diseño consciente de tu futuro",
            Self::Luxury => "El viaje como derecho de nacimiento",
            Self::Manifesto => "Escribiendo la historia de tu vida",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Self::Votum => Palette {
                background: hex(0x0a0f1a),
                text: hex(0xffffff),
                accent: RGBAColor(255, 255, 255, 0.1),
                gold: hex(0xc6a15b),
                card_background: hex(0x111827),
            },
            Self::Luxury => Palette {
                background: hex(0x0f172a),
                text: hex(0xffffff),
                accent: hex(0x334155),
                gold: hex(0xc6a15b),
                card_background: hex(0x1e293b),
            },
            Self::Manifesto => Palette {
                background: hex(0xfefce8),
                text: hex(0x854d0e),
                accent: hex(0xfef9c3),
                gold: hex(0xc6a15b),
                card_background: hex(0xffffff),
            },
            Self::Vmap => Palette {
                background: hex(0xffffff),
                text: hex(0x1e293b),
                accent: hex(0xf1f5f9),
                gold: hex(0x6366f1),
                card_background: hex(0xf8fafc),
            },
        }
    }

    /// Opacity applied to card descriptions.
    pub fn description_opacity(&self) -> f64 {
        match self {
            Self::Votum => 1.0,
            _ => 0.8,
        }
    }
}

const fn hex(rgb: u32) -> RGBAColor {
    RGBAColor((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, 1.0)
}

impl Display for Theme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

impl FromStr for Theme {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "votum" => Ok(Self::Votum),
            "vmap" | "mapa" => Ok(Self::Vmap),
            "luxury" | "abundancia" => Ok(Self::Luxury),
            "manifesto" | "manifiesto" => Ok(Self::Manifesto),
            _ => Err(ParseKindError {
                kind: "theme",
                value: s.to_string(),
            }),
        }
    }
}
