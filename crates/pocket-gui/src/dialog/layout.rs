//! Dialog box geometry.

use crate::dialog::OptionList;
use crate::gui::Gui;

/// Share of the screen a dialog box may cover, per axis.
const MAX_BOX_RATIO: f32 = 0.82;

pub(crate) const BOX_PADDING: i32 = 6;
pub(crate) const ROW_PADDING_Y: i32 = 1;
pub(crate) const ROW_PADDING_X: i32 = 8;
/// Gap between the header and the first row.
pub(crate) const HEADER_GAP: i32 = 6;
pub(crate) const SEPARATOR: &str = ": ";

/// Where everything of one dialog frame goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogLayout {
    pub box_x: i32,
    pub box_y: i32,
    pub box_width: i32,
    pub box_height: i32,
    /// Text area width, between the row paddings.
    pub inner_width: i32,
    pub label_width: i32,
    pub value_width: i32,
    pub sep_width: i32,
    /// Top of the first row, below the header band.
    pub rows_y: i32,
    pub row_heights: Vec<i32>,
    /// First visible row.
    pub top: usize,
    /// One past the last visible row.
    pub end: usize,
}

impl DialogLayout {
    /// Measure `options` and fit them in a box centered on the screen. The
    /// visible window starts at the page that contains `selected`.
    pub fn compute(
        gui: &mut Gui,
        header: Option<&str>,
        options: &OptionList,
        selected: Option<usize>,
    ) -> Self {
        let screen = gui.screen_size();
        let font_height = gui.font_info().height;
        let sep_width = gui.calc_text_size(SEPARATOR, 0).width;
        let max_box_width = (MAX_BOX_RATIO * screen.width as f32) as i32;
        let max_box_height = (MAX_BOX_RATIO * screen.height as f32) as i32;
        let header_band = if header.is_some() { font_height + HEADER_GAP } else { 0 };

        let mut box_width = BOX_PADDING * 2;
        let mut box_height = BOX_PADDING * 2 + header_band;
        let mut inner_width = gui.calc_text_size(header.unwrap_or(""), 0).width;
        let max_inner_width = max_box_width - sep_width - (ROW_PADDING_X + BOX_PADDING) * 2;
        let mut label_width = -1;
        let mut value_width = -1;
        let mut row_heights = Vec::with_capacity(options.len());

        for option in options {
            let label = gui.calc_text_size(&option.label, max_inner_width);
            inner_width = inner_width.max(label.width);
            let mut height = label.height;
            if let Some(value) = &option.value {
                let value = gui.calc_text_size(value, max_inner_width - label.width);
                label_width = label_width.max(label.width);
                value_width = value_width.max(value.width);
                height = height.max(value.height);
            }
            let row = height + ROW_PADDING_Y * 2;
            row_heights.push(row);
            box_height += row;
        }

        label_width = label_width.min(max_box_width);
        value_width = value_width.min(max_box_width);
        if value_width >= 0 {
            inner_width = inner_width.max(label_width + value_width + sep_width);
        }
        inner_width = inner_width.min(max_box_width);
        value_width = inner_width - label_width - sep_width;
        box_width += inner_width + ROW_PADDING_X * 2;
        box_height = box_height.min(max_box_height);

        let box_x = (screen.width - box_width) / 2;
        let box_y = (screen.height - box_height) / 2;
        let rows_y = box_y + BOX_PADDING + header_band;
        let bottom = box_y + box_height;

        let mut top = 0;
        if let Some(sel) = selected.filter(|&s| s < row_heights.len()) {
            let mut y = rows_y;
            for (i, &h) in row_heights.iter().enumerate() {
                y += h;
                if y >= bottom {
                    if sel < i {
                        break;
                    }
                    // Row i opens the next page.
                    y = rows_y + h;
                    top = i;
                }
            }
        }

        let mut end = top;
        let mut y = rows_y;
        while end < row_heights.len() && y + row_heights[end] < bottom {
            y += row_heights[end];
            end += 1;
        }

        Self {
            box_x,
            box_y,
            box_width,
            box_height,
            inner_width,
            label_width,
            value_width,
            sep_width,
            rows_y,
            row_heights,
            top,
            end,
        }
    }

    pub fn has_above(&self) -> bool {
        self.top > 0
    }

    pub fn has_below(&self) -> bool {
        self.end < self.row_heights.len()
    }

    pub fn visible(&self) -> std::ops::Range<usize> {
        self.top..self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::DialogOption;
    use crate::gui::tests::rig_with;

    fn numbered(n: usize) -> OptionList {
        let mut list = OptionList::with_capacity(n);
        for i in 0..n {
            list.push(DialogOption::new(i as i32 + 1, format!("Item {i}"))).unwrap();
        }
        list
    }

    #[test]
    fn small_dialog_is_centered_and_fully_visible() {
        let mut r = rig_with(320, 240, Vec::new());
        let list = numbered(3);
        let layout = DialogLayout::compute(&mut r.gui, Some("Menu"), &list, Some(0));
        assert_eq!(layout.row_heights, vec![10, 10, 10]);
        assert_eq!(layout.visible(), 0..3);
        assert!(!layout.has_above() && !layout.has_below());
        // "Item 0" is the widest text: 48 px.
        assert_eq!(layout.inner_width, 48);
        assert_eq!(layout.box_width, 12 + 48 + 16);
        assert_eq!(layout.box_height, 12 + 14 + 30);
        assert_eq!(layout.box_x, (320 - layout.box_width) / 2);
        assert_eq!(layout.box_y, (240 - layout.box_height) / 2);
    }

    #[test]
    fn two_column_rows_share_label_width() {
        let mut r = rig_with(320, 240, Vec::new());
        let mut list = OptionList::new();
        list.push(DialogOption::new(0, "Ver.").with_value("1.0")).unwrap();
        list.push(DialogOption::new(0, "By").with_value("someone")).unwrap();
        let layout = DialogLayout::compute(&mut r.gui, None, &list, Some(0));
        assert_eq!(layout.label_width, 32);
        assert_eq!(layout.sep_width, 16);
        assert_eq!(layout.value_width, 56);
        assert_eq!(layout.inner_width, 32 + 16 + 56);
    }

    #[test]
    fn long_list_scrolls_to_the_last_page() {
        let mut r = rig_with(160, 128, Vec::new());
        let list = numbered(20);

        let first = DialogLayout::compute(&mut r.gui, Some("Long"), &list, Some(0));
        assert_eq!(first.visible(), 0..8);
        assert!(!first.has_above());
        assert!(first.has_below());

        let last = DialogLayout::compute(&mut r.gui, Some("Long"), &list, Some(19));
        assert!(last.visible().contains(&19));
        assert!(last.has_above());
        assert!(!last.has_below());
    }

    #[test]
    fn box_never_exceeds_screen_share() {
        let mut r = rig_with(160, 128, Vec::new());
        let mut list = OptionList::new();
        list.push(DialogOption::new(1, "A".repeat(60))).unwrap();
        let layout = DialogLayout::compute(&mut r.gui, None, &list, None);
        assert!(layout.box_width <= 131 + 12 + 16);
        assert!(layout.inner_width <= 131);
        // The label wrapped onto several lines.
        assert!(layout.row_heights[0] > 10);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn selection_is_always_visible(
                rows in 1usize..=24,
                pick in any::<usize>(),
                height in 64i32..=240,
                header in any::<bool>(),
            ) {
                let mut r = rig_with(160, height, Vec::new());
                let list = numbered(rows);
                let sel = pick % rows;
                let title = header.then_some("Title");
                let layout = DialogLayout::compute(&mut r.gui, title, &list, Some(sel));
                prop_assert!(layout.visible().contains(&sel), "row {} hidden", sel);
            }
        }
    }
}
