//! Dialog color themes.

use pocket_types::color::Rgb565;
use pocket_types::error::Result;
use serde::{Deserialize, Serialize};

/// Colors used by every dialog and box. One theme is active at a time and
/// is replaced wholesale with [`crate::Gui::set_theme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Box fill, and the text color of the selected row.
    pub box_background: Rgb565,
    /// Header text.
    pub box_header: Rgb565,
    /// One-pixel outline around the box.
    pub box_border: Rgb565,
    /// Selectable rows.
    pub item_standard: Rgb565,
    /// Disabled and informational rows.
    pub item_disabled: Rgb565,
    /// Scroll indicator dots.
    pub scrollbar: Rgb565,
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

impl Theme {
    /// Navy boxes with white text.
    pub const fn classic() -> Self {
        Self {
            box_background: Rgb565::NAVY,
            box_header: Rgb565::WHITE,
            box_border: Rgb565::DIM_GRAY,
            item_standard: Rgb565::WHITE,
            item_disabled: Rgb565::GRAY,
            scrollbar: Rgb565::RED,
        }
    }

    pub const fn dark() -> Self {
        Self {
            box_background: Rgb565::BLACK,
            box_header: Rgb565::SILVER,
            box_border: Rgb565::GRAY,
            item_standard: Rgb565::SILVER,
            item_disabled: Rgb565::DIM_GRAY,
            scrollbar: Rgb565::ORANGE,
        }
    }

    pub const fn high_contrast() -> Self {
        Self {
            box_background: Rgb565::BLACK,
            box_header: Rgb565::WHITE,
            box_border: Rgb565::WHITE,
            item_standard: Rgb565::WHITE,
            item_disabled: Rgb565::SILVER,
            scrollbar: Rgb565::WHITE,
        }
    }

    /// Parse a theme from TOML. Colors are raw RGB565 integers; missing keys
    /// fall back to [`Theme::classic`].
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
