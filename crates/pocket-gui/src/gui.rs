//! The GUI context and its drawing primitives.
//!
//! Drawing is staged in a scratch buffer owned by [`Gui`] and pushed to the
//! display in as few `write` calls as possible: one per text line, four for a
//! border and one per 16-row band of a filled area.

use std::ops::{BitOr, BitOrAssign};
use std::rc::Rc;
use std::sync::LazyLock;
use std::time::Duration;

use pocket_types::backend::{Display, Input, Settings, Shared, Size};
use pocket_types::color::Rgb565;
use pocket_types::config::GuiConfig;
use pocket_types::error::{PocketError, Result};

use crate::font::{FontInfo, fonts};
use crate::glyph::{Glyph, GlyphCache};
use crate::image::Image;
use crate::theme::Theme;

/// Settings key of the persisted font type.
pub const SETTING_FONT_TYPE: &str = "FontType";

/// Height of one filled band in [`Gui::draw_rect`].
const FILL_BAND_ROWS: i32 = 16;

const BATTERY_WIDTH: i32 = 20;
const BATTERY_HEIGHT: i32 = 10;

/// Layout flags for [`Gui::draw_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextFlags(pub u32);

impl TextFlags {
    pub const NONE: Self = Self(0);
    pub const ALIGN_RIGHT: Self = Self(1 << 0);
    pub const ALIGN_CENTER: Self = Self(1 << 1);
    /// Wrap at the clip width and keep going on the next line.
    pub const MULTILINE: Self = Self(1 << 2);
    /// Measure only; nothing reaches the display.
    pub const DUMMY_DRAW: Self = Self(1 << 3);

    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl BitOr for TextFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TextFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Everything the GUI needs, passed explicitly instead of living in globals.
pub struct Gui {
    display: Shared<dyn Display>,
    input: Shared<dyn Input>,
    settings: Shared<dyn Settings>,
    theme: Theme,
    font: FontInfo,
    glyphs: GlyphCache,
    scratch: Vec<Rgb565>,
    screen: Size,
    poll_interval: Duration,
}

impl Gui {
    pub fn new(
        display: Shared<dyn Display>,
        input: Shared<dyn Input>,
        settings: Shared<dyn Settings>,
        config: &GuiConfig,
    ) -> Result<Self> {
        let screen = display.borrow().status().screen;
        if screen.width <= 0 || screen.height <= 0 {
            return Err(PocketError::Display(format!(
                "unusable screen size {}x{}",
                screen.width, screen.height
            )));
        }

        let rows = config.scratch_rows.max(1);
        let scratch = vec![Rgb565::BLACK; screen.width.max(screen.height) as usize * rows];

        let requested = match config.font_type {
            Some(t) => t,
            None => usize::try_from(settings.borrow().get_i32(SETTING_FONT_TYPE, 0)).unwrap_or(0),
        };
        let Some(font) = FontInfo::for_type(requested).or_else(|| FontInfo::for_type(0)) else {
            return Err(PocketError::Display("no font available".to_string()));
        };
        log::info!(
            "gui ready: {}x{} screen, font {} ({} points)",
            screen.width,
            screen.height,
            font.font.name,
            font.points
        );

        Ok(Self {
            display,
            input,
            settings,
            theme: Theme::default(),
            font,
            glyphs: GlyphCache::new(),
            scratch,
            screen,
            poll_interval: config.poll_interval(),
        })
    }

    pub fn display(&self) -> Shared<dyn Display> {
        Rc::clone(&self.display)
    }

    pub fn input(&self) -> Shared<dyn Input> {
        Rc::clone(&self.input)
    }

    pub fn settings(&self) -> Shared<dyn Settings> {
        Rc::clone(&self.settings)
    }

    pub fn screen_size(&self) -> Size {
        self.screen
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn font_info(&self) -> FontInfo {
        self.font
    }

    pub fn glyph_cache(&self) -> &GlyphCache {
        &self.glyphs
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Select a font type and persist the choice. Negative values count from
    /// the end of the font table. Returns false for an unknown type.
    pub fn set_font_type(&mut self, font_type: i32) -> bool {
        let count = fonts().len() as i32;
        let index = if font_type < 0 { font_type + count } else { font_type };
        let Some(font) = usize::try_from(index).ok().and_then(FontInfo::for_type) else {
            return false;
        };
        self.font = font;
        self.settings
            .borrow_mut()
            .set_i32(SETTING_FONT_TYPE, font.font_type as i32);
        log::info!(
            "font set to {} {} ({}x{})",
            font.font.name,
            font.points,
            font.width,
            font.height
        );
        true
    }

    fn glyph(&mut self, c: char) -> Glyph {
        let font = self.font;
        self.glyphs.get(font.font_type, font.font, font.points, c)
    }

    /// Scratch slice of `len` pixels filled with `color`, growing the buffer
    /// when a draw needs more than it was sized for.
    fn scratch_filled(&mut self, len: usize, color: Rgb565) -> &mut [Rgb565] {
        if self.scratch.len() < len {
            log::debug!("growing scratch buffer to {len} pixels");
            self.scratch.resize(len, Rgb565::BLACK);
        }
        let buf = &mut self.scratch[..len];
        buf.fill(color);
        buf
    }

    /// Draw `text` at (`x`, `y`) and return the area it covers.
    ///
    /// Negative coordinates are measured from the right or bottom edge. A
    /// `width` of 0 fits the longest line. Text is clipped at the screen's
    /// right edge; with [`TextFlags::MULTILINE`] it wraps there instead.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_text(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        text: &str,
        fg: Rgb565,
        bg: Rgb565,
        flags: TextFlags,
    ) -> Size {
        let x = if x < 0 { x + self.screen.width } else { x };
        let y = if y < 0 { y + self.screen.height } else { y };
        let chars: Vec<char> = if text.is_empty() {
            vec![' ']
        } else {
            text.chars().collect()
        };

        let mut width = width;
        if width == 0 {
            let mut line = 0;
            for (i, &c) in chars.iter().enumerate() {
                line += self.glyph(c).width;
                if c == '\n' || i + 1 == chars.len() {
                    width = width.max(line);
                    line = 0;
                }
            }
        }

        let draw_width = width.min(self.screen.width - x);
        if draw_width <= 0 {
            return Size::new(0, 0);
        }

        let font_height = self.font.height;
        let multiline = flags.contains(TextFlags::MULTILINE);
        let dummy = flags.contains(TextFlags::DUMMY_DRAW);
        let line_len = (draw_width * font_height) as usize;
        let mut y_offset = 0;
        let mut pos = 0;

        while pos < chars.len() {
            let line_start = pos;
            let mut x_offset = 0;

            if !dummy {
                self.scratch_filled(line_len, bg);
            }

            if flags.contains(TextFlags::ALIGN_RIGHT) || flags.contains(TextFlags::ALIGN_CENTER) {
                let mut probe = pos;
                while x_offset < draw_width && probe < chars.len() && chars[probe] != '\n' {
                    let w = self.glyph(chars[probe]).width;
                    probe += 1;
                    if draw_width - x_offset < w {
                        break;
                    }
                    x_offset += w;
                }
                x_offset = if flags.contains(TextFlags::ALIGN_CENTER) {
                    (draw_width - x_offset) / 2
                } else {
                    draw_width - x_offset
                };
            }

            while x_offset < draw_width {
                let glyph = self.glyph(chars[pos]);
                pos += 1;
                if draw_width - x_offset < glyph.width {
                    if multiline {
                        pos -= 1;
                    }
                    break;
                }
                if !dummy {
                    for gy in 0..font_height {
                        let row = (gy * draw_width + x_offset) as usize;
                        for gx in 0..glyph.width {
                            self.scratch[row + gx as usize] =
                                if glyph.is_set(gx, gy) { fg } else { bg };
                        }
                    }
                }
                x_offset += glyph.width;
                if pos >= chars.len() || chars[pos] == '\n' {
                    break;
                }
            }

            if !dummy {
                self.display.borrow_mut().write(
                    x,
                    y + y_offset,
                    draw_width,
                    font_height,
                    0,
                    &self.scratch[..line_len],
                );
            }
            y_offset += font_height;

            if !multiline {
                break;
            }
            // A glyph wider than the whole clip can never be placed.
            if pos == line_start {
                pos += 1;
            }
        }

        Size::new(draw_width, y_offset)
    }

    /// Measure `text` without drawing it. A positive `wrap_width` measures it
    /// as multi-line text wrapped at that width.
    pub fn calc_text_size(&mut self, text: &str, wrap_width: i32) -> Size {
        if wrap_width > 0 {
            self.draw_text(
                -wrap_width,
                0,
                0,
                text,
                Rgb565::BLACK,
                Rgb565::BLACK,
                TextFlags::MULTILINE | TextFlags::DUMMY_DRAW,
            )
        } else {
            self.draw_text(0, 0, 0, text, Rgb565::BLACK, Rgb565::BLACK, TextFlags::DUMMY_DRAW)
        }
    }

    /// Draw a rectangle with an inner border of `border` pixels and an
    /// optional fill. The fill covers the area inside the border.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_rect(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        border: i32,
        border_color: Rgb565,
        fill: Option<Rgb565>,
    ) {
        if width <= 0 || height <= 0 || border < 0 {
            return;
        }
        let mut x = if x < 0 { x + self.screen.width } else { x };
        let mut y = if y < 0 { y + self.screen.height } else { y };
        let (mut width, mut height) = (width, height);

        if border > 0 {
            let len = (border * width.max(height)) as usize;
            self.scratch_filled(len, border_color);
            let strip = &self.scratch[..len];
            let mut display = self.display.borrow_mut();
            display.write(x, y, width, border, 0, strip);
            display.write(x, y + height - border, width, border, 0, strip);
            display.write(x, y, border, height, 0, strip);
            display.write(x + width - border, y, border, height, 0, strip);
            drop(display);

            x += border;
            y += border;
            width -= border * 2;
            height -= border * 2;
        }

        let Some(fill) = fill else {
            return;
        };
        if width <= 0 || height <= 0 {
            return;
        }
        let band = height.min(FILL_BAND_ROWS);
        self.scratch_filled((width * band) as usize, fill);
        let mut display = self.display.borrow_mut();
        let mut row = 0;
        while row < height {
            let rows = (height - row).min(FILL_BAND_ROWS);
            display.write(x, y + row, width, rows, 0, &self.scratch[..(width * rows) as usize]);
            row += FILL_BAND_ROWS;
        }
    }

    /// Draw `image` at (`x`, `y`). Non-positive sizes use the image's own;
    /// larger sizes are clipped to it.
    pub fn draw_image(&mut self, x: i32, y: i32, width: i32, height: i32, image: &Image) {
        let (iw, ih) = (image.width() as i32, image.height() as i32);
        let width = if width <= 0 { iw } else { width.min(iw) };
        let height = if height <= 0 { ih } else { height.min(ih) };
        if width <= 0 || height <= 0 {
            return;
        }
        self.display
            .borrow_mut()
            .write(x, y, width, height, image.width() as usize, image.pixels());
    }

    /// Battery gauge, 20x10 pixels. An unreadable battery shows a full red
    /// gauge.
    pub fn draw_battery(&mut self, x: i32, y: i32) {
        let reading = self.input.borrow_mut().read_battery();
        let (fill_width, color_fill) = match reading {
            Some(battery) => {
                let percent = battery.percent;
                let color = if percent < 20.0 {
                    Rgb565::RED
                } else if percent < 40.0 {
                    Rgb565::ORANGE
                } else {
                    Rgb565::FOREST_GREEN
                };
                let filled = (BATTERY_WIDTH as f32 / 100.0 * percent) as i32;
                (filled.clamp(0, BATTERY_WIDTH), color)
            },
            None => (BATTERY_WIDTH, Rgb565::RED),
        };
        let (border, empty) = (Rgb565::SILVER, Rgb565::BLACK);

        self.draw_rect(x, y, BATTERY_WIDTH + 2, BATTERY_HEIGHT, 1, border, None);
        self.draw_rect(x + BATTERY_WIDTH + 2, y + 2, 2, BATTERY_HEIGHT - 4, 1, border, None);
        self.draw_rect(x + 1, y + 1, fill_width, BATTERY_HEIGHT - 2, 0, empty, Some(color_fill));
        self.draw_rect(
            x + 1 + fill_width,
            y + 1,
            BATTERY_WIDTH - fill_width,
            BATTERY_HEIGHT - 2,
            0,
            empty,
            Some(empty),
        );
    }

    /// Busy indicator in the middle of the screen.
    pub fn draw_hourglass(&mut self) {
        let icon = &*HOURGLASS;
        let x = (self.screen.width - icon.width() as i32) / 2;
        let y = (self.screen.height - icon.height() as i32) / 2;
        self.draw_image(x, y, 0, 0, icon);
    }

    /// Fill the whole screen.
    pub fn clear(&mut self, color: Rgb565) {
        self.display.borrow_mut().clear(color);
    }

    pub(crate) fn sleep_poll(&self) {
        if !self.poll_interval.is_zero() {
            std::thread::sleep(self.poll_interval);
        }
    }
}

const HOURGLASS_ART: [&str; 16] = [
    "############",
    "#..........#",
    " #........# ",
    " #........# ",
    "  #......#  ",
    "   #....#   ",
    "    #..#    ",
    "     ##     ",
    "     ##     ",
    "    #  #    ",
    "   #    #   ",
    "  #  ..  #  ",
    " # ...... # ",
    " #........# ",
    "#..........#",
    "############",
];

static HOURGLASS: LazyLock<Image> = LazyLock::new(|| {
    let pixels = HOURGLASS_ART
        .iter()
        .flat_map(|row| row.bytes())
        .map(|b| match b {
            b'#' => Rgb565::SILVER,
            b'.' => Rgb565::ORANGE,
            _ => Rgb565::BLACK,
        })
        .collect();
    let width = HOURGLASS_ART[0].len() as u32;
    Image::from_pixels(width, HOURGLASS_ART.len() as u32, pixels).unwrap_or_default()
});

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pocket_types::backend::shared;
    use pocket_types::input::{BatteryReading, Keys};
    use pocket_types::test_utils::{DisplayCall, MemorySettings, MockDisplay, ScriptedInput};

    pub(crate) struct Rig {
        pub gui: Gui,
        pub display: Shared<MockDisplay>,
        pub input: Shared<ScriptedInput>,
        pub settings: Shared<MemorySettings>,
    }

    pub(crate) fn rig_with(width: i32, height: i32, script: Vec<Keys>) -> Rig {
        let display = shared(MockDisplay::new(width, height));
        let input = shared(ScriptedInput::new(script));
        let settings = shared(MemorySettings::new());
        let config = GuiConfig {
            poll_interval_ms: 0,
            ..GuiConfig::default()
        };
        let gui = Gui::new(
            Rc::clone(&display) as Shared<dyn Display>,
            Rc::clone(&input) as Shared<dyn Input>,
            Rc::clone(&settings) as Shared<dyn Settings>,
            &config,
        )
        .unwrap();
        Rig {
            gui,
            display,
            input,
            settings,
        }
    }

    pub(crate) fn rig() -> Rig {
        rig_with(320, 240, Vec::new())
    }

    const FG: Rgb565 = Rgb565::WHITE;
    const BG: Rgb565 = Rgb565::NAVY;

    #[test]
    fn zero_sized_screen_is_rejected() {
        let display = shared(MockDisplay::new(0, 240));
        let result = Gui::new(
            display,
            shared(ScriptedInput::new([])),
            shared(MemorySettings::new()),
            &GuiConfig::default(),
        );
        assert!(matches!(result, Err(PocketError::Display(_))));
    }

    #[test]
    fn font_type_comes_from_settings() {
        let mut settings = MemorySettings::new();
        settings.set_i32(SETTING_FONT_TYPE, 2);
        let gui = Gui::new(
            shared(MockDisplay::new(320, 240)),
            shared(ScriptedInput::new([])),
            shared(settings),
            &GuiConfig::default(),
        )
        .unwrap();
        assert_eq!(gui.font_info().points, 16);
    }

    #[test]
    fn single_line_size_and_one_write() {
        let mut r = rig();
        let size = r.gui.draw_text(10, 20, 0, "AB", FG, BG, TextFlags::NONE);
        assert_eq!(size, Size::new(16, 8));
        let d = r.display.borrow();
        assert_eq!(d.writes(), vec![(10, 20, 16, 8)]);
        assert!(d.count_in(10, 20, 16, 8, FG) > 0);
        assert_eq!(d.count_in(10, 20, 16, 8, FG) + d.count_in(10, 20, 16, 8, BG), 16 * 8);
    }

    #[test]
    fn empty_text_draws_a_space() {
        let mut r = rig();
        let size = r.gui.draw_text(0, 0, 0, "", FG, BG, TextFlags::NONE);
        assert_eq!(size, Size::new(8, 8));
        assert_eq!(r.display.borrow().count_in(0, 0, 8, 8, BG), 64);
    }

    #[test]
    fn negative_coordinates_anchor_to_far_edges() {
        let mut r = rig();
        r.gui.draw_text(-16, -8, 0, "AB", FG, BG, TextFlags::NONE);
        assert_eq!(r.display.borrow().writes(), vec![(304, 232, 16, 8)]);
    }

    #[test]
    fn clipped_at_right_edge() {
        let mut r = rig();
        let size = r.gui.draw_text(300, 0, 0, "ABCDEFGH", FG, BG, TextFlags::NONE);
        assert_eq!(size, Size::new(20, 8));
        assert_eq!(r.display.borrow().writes(), vec![(300, 0, 20, 8)]);
    }

    #[test]
    fn off_screen_draws_nothing() {
        let mut r = rig();
        assert_eq!(r.gui.draw_text(320, 0, 0, "A", FG, BG, TextFlags::NONE), Size::new(0, 0));
        assert_eq!(r.display.borrow().write_count(), 0);
    }

    #[test]
    fn multiline_wraps_and_splits_on_newline() {
        let mut r = rig();
        let size = r.gui.draw_text(0, 0, 24, "ABCDE\nF", FG, BG, TextFlags::MULTILINE);
        // "ABC" / "DE" / "F"
        assert_eq!(size, Size::new(24, 24));
        assert_eq!(r.display.borrow().write_count(), 3);
    }

    #[test]
    fn autosize_takes_longest_line() {
        let mut r = rig();
        let size = r.gui.draw_text(0, 0, 0, "AB\nCDEF\nG", FG, BG, TextFlags::MULTILINE);
        assert_eq!(size, Size::new(32, 24));
    }

    #[test]
    fn dummy_draw_only_measures() {
        let mut r = rig();
        let size = r.gui.draw_text(0, 0, 0, "Hello", FG, BG, TextFlags::DUMMY_DRAW);
        assert_eq!(size, Size::new(40, 8));
        assert_eq!(r.display.borrow().write_count(), 0);
    }

    #[test]
    fn right_alignment_pads_left() {
        let mut r = rig();
        r.gui.draw_text(0, 0, 32, "A", FG, BG, TextFlags::ALIGN_RIGHT);
        let d = r.display.borrow();
        assert_eq!(d.count_in(0, 0, 24, 8, BG), 24 * 8);
        assert!(d.count_in(24, 0, 8, 8, FG) > 0);
    }

    #[test]
    fn center_alignment_splits_padding() {
        let mut r = rig();
        r.gui.draw_text(0, 0, 24, "A", FG, BG, TextFlags::ALIGN_CENTER);
        let d = r.display.borrow();
        assert_eq!(d.count_in(0, 0, 8, 8, BG), 64);
        assert_eq!(d.count_in(16, 0, 8, 8, BG), 64);
        assert!(d.count_in(8, 0, 8, 8, FG) > 0);
    }

    #[test]
    fn calc_text_size_wraps() {
        let mut r = rig();
        assert_eq!(r.gui.calc_text_size("ABCD", 0), Size::new(32, 8));
        assert_eq!(r.gui.calc_text_size("ABCD", 16), Size::new(16, 16));
        assert_eq!(r.display.borrow().write_count(), 0);
    }

    #[test]
    fn glyph_wider_than_clip_does_not_hang() {
        let mut r = rig();
        let size = r.gui.draw_text(0, 0, 4, "AB", FG, BG, TextFlags::MULTILINE);
        assert_eq!(size.width, 4);
        assert_eq!(size.height, 16);
    }

    #[test]
    fn glyphs_are_cached() {
        let mut r = rig();
        r.gui.draw_text(0, 0, 0, "AAAA", FG, BG, TextFlags::NONE);
        let (hits, misses) = r.gui.glyph_cache().stats();
        assert_eq!(misses, 1);
        assert!(hits >= 3);
    }

    #[test]
    fn rect_border_and_fill() {
        let mut r = rig();
        r.gui.draw_rect(10, 10, 20, 40, 2, Rgb565::RED, Some(Rgb565::BLUE));
        let d = r.display.borrow();
        // Four border strips, then 36 fill rows in bands of 16.
        assert_eq!(d.write_count(), 4 + 3);
        assert_eq!(d.count_in(12, 12, 16, 36, Rgb565::BLUE), 16 * 36);
        assert_eq!(d.count_in(10, 10, 20, 40, Rgb565::RED), 20 * 40 - 16 * 36);
    }

    #[test]
    fn rect_without_fill_only_borders() {
        let mut r = rig();
        r.gui.draw_rect(0, 0, 10, 10, 1, Rgb565::RED, None);
        assert_eq!(r.display.borrow().write_count(), 4);
        assert_eq!(r.display.borrow().count_in(1, 1, 8, 8, Rgb565::BLACK), 64);
    }

    #[test]
    fn degenerate_rect_is_noop() {
        let mut r = rig();
        r.gui.draw_rect(0, 0, 0, 10, 1, Rgb565::RED, Some(Rgb565::RED));
        r.gui.draw_rect(0, 0, 10, -1, 1, Rgb565::RED, Some(Rgb565::RED));
        assert_eq!(r.display.borrow().write_count(), 0);
    }

    #[test]
    fn border_larger_than_half_skips_fill() {
        let mut r = rig();
        r.gui.draw_rect(0, 0, 4, 4, 2, Rgb565::RED, Some(Rgb565::BLUE));
        assert_eq!(r.display.borrow().write_count(), 4);
    }

    #[test]
    fn image_uses_its_own_stride() {
        let mut r = rig();
        let img = Image::from_pixels(3, 2, vec![Rgb565::RED; 6]).unwrap();
        r.gui.draw_image(5, 5, 0, 0, &img);
        let d = r.display.borrow();
        assert_eq!(d.writes(), vec![(5, 5, 3, 2)]);
        assert_eq!(d.count_in(5, 5, 3, 2, Rgb565::RED), 6);
    }

    #[test]
    fn battery_levels_pick_colors() {
        for (percent, color) in [(10.0, Rgb565::RED), (30.0, Rgb565::ORANGE), (90.0, Rgb565::FOREST_GREEN)] {
            let mut r = rig();
            r.input.borrow_mut().battery = Some(BatteryReading { percent, voltage: 3.7 });
            r.gui.draw_battery(0, 0);
            let filled = (20.0_f32 / 100.0 * percent) as usize;
            assert_eq!(r.display.borrow().count_in(1, 1, 20, 8, color), filled * 8);
        }
    }

    #[test]
    fn unreadable_battery_is_full_red() {
        let mut r = rig();
        r.input.borrow_mut().battery = None;
        r.gui.draw_battery(0, 0);
        assert_eq!(r.display.borrow().count_in(1, 1, 20, 8, Rgb565::RED), 160);
    }

    #[test]
    fn hourglass_is_centered() {
        let mut r = rig();
        r.gui.draw_hourglass();
        assert_eq!(r.display.borrow().writes(), vec![(154, 112, 12, 16)]);
    }

    #[test]
    fn font_type_is_persisted_and_wraps_negative() {
        let mut r = rig();
        assert!(r.gui.set_font_type(1));
        assert_eq!(r.settings.borrow().get_i32(SETTING_FONT_TYPE, -1), 1);
        assert!(r.gui.set_font_type(-1));
        assert_eq!(r.gui.font_info().font_type, fonts().len() - 1);
        assert!(!r.gui.set_font_type(99));
        assert_eq!(r.gui.font_info().font_type, fonts().len() - 1);
    }

    #[test]
    fn larger_font_grows_line_height() {
        let mut r = rig();
        r.gui.set_font_type(2);
        assert_eq!(r.gui.draw_text(0, 0, 0, "A", FG, BG, TextFlags::NONE).height, 16);
    }

    #[test]
    fn clear_reaches_display() {
        let mut r = rig();
        r.gui.clear(Rgb565::BLUE);
        assert_eq!(r.display.borrow().calls, vec![DisplayCall::Clear(Rgb565::BLUE)]);
    }

    #[test]
    fn flags_contains() {
        let f = TextFlags::MULTILINE | TextFlags::DUMMY_DRAW;
        assert!(f.contains(TextFlags::MULTILINE));
        assert!(!f.contains(TextFlags::ALIGN_RIGHT));
        assert!(!f.contains(TextFlags::NONE));
    }
}
