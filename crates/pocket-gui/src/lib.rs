//! Immediate-mode GUI for the pocket runtime.
//!
//! Everything draws through one [`Gui`] context: text and rectangles are
//! staged in a scratch buffer and handed to the display collaborator one
//! block at a time. Dialogs are modal loops built on top of those primitives.

pub mod dialog;
pub mod font;
mod font_data;
pub mod glyph;
pub mod gui;
pub mod image;
pub mod theme;

pub use dialog::{
    DialogEvent, DialogOption, DialogReturn, OptionBehavior, OptionFlags, OptionList,
};
pub use font::{FontInfo, FontKind};
pub use gui::{Gui, TextFlags};
pub use image::Image;
pub use theme::Theme;
