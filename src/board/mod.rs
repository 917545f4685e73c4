pub mod fonts;
pub mod layout;
pub mod render;
pub mod theme;

use anyhow::Result;

use crate::config::Config;
use crate::plan::Plan;

pub use layout::{select_layout, BoardLayout, BOARD_HEIGHT, BOARD_WIDTH};
pub use render::render_board;
pub use theme::Theme;

#[derive(Debug, Clone)]
pub struct BoardOptions {
    pub theme: Theme,
    pub title: String,
    pub jpeg_quality: u8,
}

impl BoardOptions {
    /// Export settings from config, with optional per-request theme and title.
    pub fn from_config(config: &Config, theme: Option<Theme>, title: Option<String>) -> Result<Self> {
        let theme = match theme {
            Some(theme) => theme,
            None => config.export.theme.parse()?,
        };
        let title = title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| config.export.resolved_board_title());
        Ok(Self {
            theme,
            title,
            jpeg_quality: config.export.jpeg_quality,
        })
    }
}

/// Renders the board with the configured font, if any.
pub fn export_board(plan: &Plan, config: &Config, options: &BoardOptions) -> Result<Vec<u8>> {
    let font_path = config.resolved_font_path();
    let draw_text = fonts::ensure_font(font_path.as_deref());
    render_board(plan, options, draw_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_fall_back_to_config() {
        let mut config = Config::default();
        config.export.year = Some(2027);
        config.export.theme = "luxury".to_string();

        let options = BoardOptions::from_config(&config, None, Some("  ".to_string())).unwrap();
        assert_eq!(options.theme, Theme::Luxury);
        assert_eq!(options.title, "MI MAPA DE POSIBILIDADES 2027");

        let options =
            BoardOptions::from_config(&config, Some(Theme::Vmap), Some("Mi año".to_string())).unwrap();
        assert_eq!(options.theme, Theme::Vmap);
        assert_eq!(options.title, "Mi año");
    }

    #[test]
    fn bad_configured_theme_is_an_error() {
        let mut config = Config::default();
        config.export.theme = "neon".to_string();
        assert!(BoardOptions::from_config(&config, None, None).is_err());
    }
}
