//! The modal dialog loop and its renderer.

use pocket_types::color::Rgb565;
use pocket_types::input::Keys;

use crate::dialog::layout::{
    BOX_PADDING, DialogLayout, ROW_PADDING_X, ROW_PADDING_Y, SEPARATOR,
};
use crate::dialog::{DialogEvent, DialogReturn, OptionFlags, OptionList};
use crate::gui::{Gui, TextFlags};

const CANCEL_KEYS: [Keys; 3] = [Keys::B, Keys::OPTION, Keys::MENU];

const ACTION_KEYS: [(Keys, DialogEvent); 4] = [
    (Keys::LEFT, DialogEvent::Prev),
    (Keys::RIGHT, DialogEvent::Next),
    (Keys::START, DialogEvent::Alt),
    (Keys::A, DialogEvent::Enter),
];

impl Gui {
    /// Run a modal dialog and return the id of the chosen row, or `None`
    /// when it was cancelled.
    ///
    /// A negative `selected` counts from the end (`-1` is the last row).
    /// Keys act on press and must be released before they act again.
    pub fn dialog(
        &mut self,
        header: Option<&str>,
        mut options: OptionList,
        selected: i32,
    ) -> Option<i32> {
        for option in options.iter_mut() {
            if let Some(behavior) = option.behavior.as_mut() {
                if let Some(value) = behavior.init(self) {
                    option.value = Some(value);
                }
            }
        }

        let count = options.len() as i32;
        let requested = if selected < 0 { count + selected } else { selected };
        let mut sel_old = requested;
        let mut sel = requested.max(0).min(count - 1);
        let mut last_key: Option<Keys> = None;
        let input = self.input();

        input.borrow_mut().wait_for_key(Keys::ALL, false);
        self.draw_dialog(header, &options, sel);

        loop {
            let joystick = input.borrow_mut().read_gamepad();

            if let Some(key) = last_key {
                if !joystick.intersects(key) {
                    last_key = None;
                }
            } else {
                let mut select = DialogReturn::Ignore;

                if count > 0 && joystick.intersects(Keys::UP) {
                    last_key = Some(Keys::UP);
                    sel -= 1;
                    if sel < 0 {
                        sel = count - 1;
                    }
                } else if count > 0 && joystick.intersects(Keys::DOWN) {
                    last_key = Some(Keys::DOWN);
                    sel += 1;
                    if sel > count - 1 {
                        sel = 0;
                    }
                } else if let Some(&key) = CANCEL_KEYS.iter().find(|&&k| joystick.intersects(k)) {
                    last_key = Some(key);
                    select = DialogReturn::Cancel;
                }

                let active = usize::try_from(sel)
                    .ok()
                    .and_then(|i| options.get_mut(i))
                    .filter(|o| o.flags == OptionFlags::Normal);
                let action = ACTION_KEYS.iter().find(|(k, _)| joystick.intersects(*k));
                if let (Some(option), Some(&(key, event))) = (active, action) {
                    last_key = Some(key);
                    match option.behavior.as_mut() {
                        Some(behavior) => {
                            let had_value = option.value.is_some();
                            let mut value = option.value.take().unwrap_or_default();
                            select = behavior.update(event, &mut value, self);
                            if had_value || !value.is_empty() {
                                option.value = Some(value);
                            }
                            sel_old = -1;
                        },
                        None if event == DialogEvent::Enter => select = DialogReturn::Select,
                        None => {},
                    }
                }

                match select {
                    DialogReturn::Cancel => {
                        sel = -1;
                        break;
                    },
                    DialogReturn::Select => break,
                    DialogReturn::Ignore => {},
                }
            }

            if sel_old != sel {
                let step = if last_key == Some(Keys::DOWN) { 1 } else { -1 };
                let mut walked = 0;
                while walked < count && sel_old != sel && is_skip(&options, sel) {
                    sel += step;
                    if sel < 0 {
                        sel = count - 1;
                    }
                    if sel >= count {
                        sel = 0;
                    }
                    walked += 1;
                }
                self.draw_dialog(header, &options, sel);
                sel_old = sel;
            }

            self.sleep_poll();
        }

        input
            .borrow_mut()
            .wait_for_key(last_key.unwrap_or(Keys::ALL), false);
        self.display().borrow_mut().force_redraw();

        let chosen = usize::try_from(sel).ok().and_then(|i| options.get(i)).map(|o| o.id);
        log::debug!("dialog {:?} closed with {chosen:?}", header.unwrap_or(""));
        chosen
    }

    /// Render one frame of a dialog with row `selected` highlighted (a
    /// negative value highlights nothing).
    pub fn draw_dialog(
        &mut self,
        header: Option<&str>,
        options: &OptionList,
        selected: i32,
    ) -> DialogLayout {
        let selected = usize::try_from(selected).ok();
        let layout = DialogLayout::compute(self, header, options, selected);
        let theme = *self.theme();
        let font_height = self.font_info().height;
        let row_width = layout.inner_width + ROW_PADDING_X * 2;
        let bottom = layout.box_y + layout.box_height;
        let x = layout.box_x + BOX_PADDING;
        let mut y = layout.box_y + BOX_PADDING;

        if let Some(header) = header {
            self.draw_text(
                x,
                y,
                row_width,
                header,
                theme.box_header,
                theme.box_background,
                TextFlags::ALIGN_CENTER,
            );
            self.draw_rect(
                x,
                y + font_height,
                row_width,
                layout.rows_y - y - font_height,
                0,
                Rgb565::BLACK,
                Some(theme.box_background),
            );
        }
        y = layout.rows_y;

        for i in layout.visible() {
            let Some(option) = options.get(i) else {
                break;
            };
            let color = if option.flags == OptionFlags::Normal {
                theme.item_standard
            } else {
                theme.item_disabled
            };
            let (fg, bg) = if Some(i) == selected {
                (theme.box_background, color)
            } else {
                (color, theme.box_background)
            };
            let xx = x + ROW_PADDING_X;
            let yy = y + ROW_PADDING_Y;

            let height = match &option.value {
                Some(value) => {
                    let (label_w, sep_w) = (layout.label_width, layout.sep_width);
                    self.draw_text(xx, yy, label_w, &option.label, fg, bg, TextFlags::NONE);
                    self.draw_text(xx + label_w, yy, sep_w, SEPARATOR, fg, bg, TextFlags::NONE);
                    let height = self
                        .draw_text(
                            xx + label_w + sep_w,
                            yy,
                            layout.value_width,
                            value,
                            fg,
                            bg,
                            TextFlags::MULTILINE,
                        )
                        .height;
                    self.draw_rect(
                        xx,
                        yy + font_height,
                        layout.inner_width - layout.value_width,
                        height - font_height,
                        0,
                        bg,
                        Some(bg),
                    );
                    height
                },
                None => {
                    self.draw_text(
                        xx,
                        yy,
                        layout.inner_width,
                        &option.label,
                        fg,
                        bg,
                        TextFlags::MULTILINE,
                    )
                    .height
                },
            };

            self.draw_rect(x, yy, ROW_PADDING_X, height, 0, bg, Some(bg));
            self.draw_rect(xx + layout.inner_width, yy, ROW_PADDING_X, height, 0, bg, Some(bg));
            self.draw_rect(x, y, row_width, ROW_PADDING_Y, 0, bg, Some(bg));
            self.draw_rect(x, yy + height, row_width, ROW_PADDING_Y, 0, bg, Some(bg));
            y += height + ROW_PADDING_Y * 2;
        }

        if y < bottom {
            self.draw_rect(
                layout.box_x,
                y,
                layout.box_width,
                bottom - y,
                0,
                theme.box_background,
                Some(theme.box_background),
            );
        }

        self.draw_rect(
            layout.box_x,
            layout.box_y,
            layout.box_width,
            layout.box_height,
            BOX_PADDING,
            theme.box_background,
            None,
        );
        self.draw_rect(
            layout.box_x - 1,
            layout.box_y - 1,
            layout.box_width + 2,
            layout.box_height + 2,
            1,
            theme.box_border,
            None,
        );

        let dots_x = layout.box_x + layout.inner_width + BOX_PADDING;
        if layout.has_above() {
            self.draw_scroll_dots(dots_x, layout.box_y + BOX_PADDING - 1, theme.scrollbar);
        }
        if layout.has_below() {
            self.draw_scroll_dots(dots_x, bottom - BOX_PADDING - 1, theme.scrollbar);
        }

        layout
    }

    fn draw_scroll_dots(&mut self, x: i32, y: i32, color: Rgb565) {
        for dx in [0, 6, 12] {
            self.draw_rect(x + dx, y, 3, 3, 0, color, Some(color));
        }
    }
}

fn is_skip(options: &OptionList, sel: i32) -> bool {
    usize::try_from(sel)
        .ok()
        .and_then(|i| options.get(i))
        .is_some_and(|o| o.flags == OptionFlags::Skip)
}
