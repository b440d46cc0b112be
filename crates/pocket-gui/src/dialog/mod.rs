//! Modal option dialogs.
//!
//! A dialog is an [`OptionList`] rendered in a centered box and driven by a
//! polling loop (see [`Gui::dialog`]). Rows can carry an [`OptionBehavior`]
//! that reacts to left/right/start/A presses and rewrites the row's value
//! while the dialog stays open.

mod controls;
mod engine;
mod layout;
mod prompts;

use std::fmt;

use pocket_types::error::{PocketError, Result};

use crate::gui::Gui;

pub use controls::{
    AudioOutControl, BrightnessControl, FilterControl, FnBehavior, FontTypeControl,
    ScalingControl, SpeedControl, UpdateModeControl, VolumeControl,
};
pub use layout::DialogLayout;

/// Default number of rows an [`OptionList`] accepts.
pub const MAX_OPTIONS: usize = 16;

const SEPARATOR_LABEL: &str = "----------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionFlags {
    /// Shown dimmed, cannot be activated.
    Disabled,
    Normal,
    /// Shown dimmed and jumped over by up/down.
    Skip,
    /// Terminates a table read by [`OptionList::from_terminated`].
    Last,
}

/// Input delivered to an [`OptionBehavior`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogEvent {
    Prev,
    Next,
    Alt,
    Enter,
}

/// What the dialog loop should do after a behavior ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogReturn {
    Ignore,
    Select,
    Cancel,
}

/// Live behavior attached to a dialog row.
pub trait OptionBehavior {
    /// Called once when the dialog opens. `Some` replaces the row's value.
    fn init(&mut self, gui: &mut Gui) -> Option<String> {
        let _ = gui;
        None
    }

    /// React to `event`, rewriting `value` as needed.
    fn update(&mut self, event: DialogEvent, value: &mut String, gui: &mut Gui) -> DialogReturn;
}

/// One row of a dialog.
pub struct DialogOption {
    /// Returned when the row is selected. 0 marks informational rows.
    pub id: i32,
    pub label: String,
    /// Second column; rows without a value span the full width and wrap.
    pub value: Option<String>,
    pub flags: OptionFlags,
    pub behavior: Option<Box<dyn OptionBehavior>>,
}

impl DialogOption {
    pub fn new(id: i32, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            value: None,
            flags: OptionFlags::Normal,
            behavior: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_flags(mut self, flags: OptionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_behavior(mut self, behavior: impl OptionBehavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    /// A dashed rule that navigation jumps over.
    pub fn separator() -> Self {
        Self::new(0, SEPARATOR_LABEL).with_flags(OptionFlags::Skip)
    }

    /// Non-selectable text, typically a message above the choices.
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(0, text).with_flags(OptionFlags::Skip)
    }

    /// Table terminator for [`OptionList::from_terminated`].
    pub fn last() -> Self {
        Self::new(0, "").with_flags(OptionFlags::Last)
    }
}

impl fmt::Debug for DialogOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogOption")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("value", &self.value)
            .field("flags", &self.flags)
            .field("behavior", &self.behavior.is_some())
            .finish()
    }
}

/// Rows of one dialog, bounded by an explicit capacity.
#[derive(Debug)]
pub struct OptionList {
    items: Vec<DialogOption>,
    capacity: usize,
}

impl Default for OptionList {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionList {
    pub fn new() -> Self {
        Self::with_capacity(MAX_OPTIONS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a row. Fails when the list is full or the row is a terminator.
    pub fn push(&mut self, option: DialogOption) -> Result<()> {
        if option.flags == OptionFlags::Last {
            return Err(PocketError::Dialog(
                "terminator rows are only valid in terminated tables".to_string(),
            ));
        }
        if self.items.len() >= self.capacity {
            return Err(PocketError::Dialog(format!(
                "option list is full ({} rows), cannot add '{}'",
                self.capacity, option.label
            )));
        }
        self.items.push(option);
        Ok(())
    }

    /// Append every row of `options`, stopping at the first failure.
    pub fn extend(&mut self, options: impl IntoIterator<Item = DialogOption>) -> Result<()> {
        options.into_iter().try_for_each(|o| self.push(o))
    }

    /// Number of rows before the first [`OptionFlags::Last`] entry, looking
    /// at no more than [`MAX_OPTIONS`] rows. A table with no terminator in
    /// range counts as empty.
    pub fn terminated_len(table: &[DialogOption]) -> usize {
        table
            .iter()
            .take(MAX_OPTIONS + 1)
            .position(|o| o.flags == OptionFlags::Last)
            .unwrap_or(0)
    }

    /// Build from a terminator-ended table. Rows after the terminator are
    /// dropped, and so is everything when the terminator is missing.
    pub fn from_terminated(table: Vec<DialogOption>) -> Self {
        let len = Self::terminated_len(&table);
        let mut items = table;
        items.truncate(len);
        Self {
            items,
            capacity: MAX_OPTIONS,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&DialogOption> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut DialogOption> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DialogOption> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, DialogOption> {
        self.items.iter_mut()
    }
}

impl TryFrom<Vec<DialogOption>> for OptionList {
    type Error = PocketError;

    fn try_from(options: Vec<DialogOption>) -> Result<Self> {
        let mut list = Self::new();
        list.extend(options)?;
        Ok(list)
    }
}

impl<'a> IntoIterator for &'a OptionList {
    type Item = &'a DialogOption;
    type IntoIter = std::slice::Iter<'a, DialogOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<DialogOption> {
        (0..n).map(|i| DialogOption::new(i as i32 + 1, format!("Row {i}"))).collect()
    }

    fn terminated(n: usize) -> Vec<DialogOption> {
        let mut table = rows(n);
        table.push(DialogOption::last());
        table
    }

    #[test]
    fn terminated_len_counts_rows() {
        for n in [0, 1, 15, 16] {
            assert_eq!(OptionList::terminated_len(&terminated(n)), n);
        }
    }

    #[test]
    fn missing_terminator_is_empty() {
        assert_eq!(OptionList::terminated_len(&rows(20)), 0);
        assert_eq!(OptionList::terminated_len(&rows(3)), 0);
        assert_eq!(OptionList::terminated_len(&terminated(17)), 0);
    }

    #[test]
    fn from_terminated_drops_trailing_rows() {
        let mut table = terminated(2);
        table.push(DialogOption::new(9, "after"));
        let list = OptionList::from_terminated(table);
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|o| o.id != 9));
    }

    #[test]
    fn push_beyond_capacity_fails() {
        let mut list = OptionList::with_capacity(2);
        list.push(DialogOption::new(1, "a")).unwrap();
        list.push(DialogOption::new(2, "b")).unwrap();
        assert!(matches!(
            list.push(DialogOption::new(3, "c")),
            Err(PocketError::Dialog(_))
        ));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn default_capacity_is_sixteen() {
        assert!(OptionList::try_from(rows(16)).is_ok());
        assert!(OptionList::try_from(rows(17)).is_err());
    }

    #[test]
    fn terminator_rows_rejected() {
        let mut list = OptionList::new();
        assert!(list.push(DialogOption::last()).is_err());
        assert!(list.is_empty());
    }

    #[test]
    fn builders() {
        let sep = DialogOption::separator();
        assert_eq!(sep.flags, OptionFlags::Skip);
        assert_eq!(sep.id, 0);
        let row = DialogOption::new(4, "Volume").with_value("50%");
        assert_eq!(row.value.as_deref(), Some("50%"));
        assert_eq!(row.flags, OptionFlags::Normal);
        assert!(format!("{row:?}").contains("Volume"));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn terminator_position_is_the_count(n in 0usize..=MAX_OPTIONS, tail in 0usize..4) {
                let mut table = terminated(n);
                table.extend(rows(tail));
                prop_assert_eq!(OptionList::terminated_len(&table), n);
            }
        }
    }
}
