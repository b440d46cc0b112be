//! Yes/no and OK prompts.

use crate::dialog::{DialogOption, OptionList};
use crate::gui::Gui;

const YES: i32 = 1;

/// Message row plus a blank spacer, both skipped by navigation. Without a
/// message only the spacer remains.
fn message_rows(message: Option<&str>) -> Vec<DialogOption> {
    let mut rows = Vec::with_capacity(4);
    if let Some(message) = message {
        rows.push(DialogOption::info(message));
    }
    rows.push(DialogOption::info(""));
    rows
}

impl Gui {
    /// Ask a yes/no question. `yes_selected` puts the cursor on "Yes".
    pub fn confirm(&mut self, title: Option<&str>, message: Option<&str>, yes_selected: bool) -> bool {
        let mut rows = message_rows(message);
        rows.push(DialogOption::new(YES, "Yes"));
        rows.push(DialogOption::new(0, "No "));
        let options = match OptionList::try_from(rows) {
            Ok(options) => options,
            Err(e) => {
                log::error!("confirm: {e}");
                return false;
            },
        };
        let selected = if yes_selected { -2 } else { -1 };
        self.dialog(title, options, selected) == Some(YES)
    }

    /// Show a message with a single OK button.
    pub fn alert(&mut self, title: Option<&str>, message: Option<&str>) {
        let mut rows = message_rows(message);
        rows.push(DialogOption::new(YES, "OK"));
        match OptionList::try_from(rows) {
            Ok(options) => {
                self.dialog(title, options, -1);
            },
            Err(e) => log::error!("alert: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pocket_types::input::Keys;

    use crate::gui::tests::rig_with;

    fn taps(keys: &[Keys]) -> Vec<Keys> {
        keys.iter().flat_map(|&k| [k, Keys::NONE]).collect()
    }

    #[test]
    fn confirm_with_yes_preselected() {
        let mut r = rig_with(320, 240, taps(&[Keys::A]));
        assert!(r.gui.confirm(Some("Title"), Some("Proceed?"), true));
    }

    #[test]
    fn confirm_defaults_to_no() {
        let mut r = rig_with(320, 240, taps(&[Keys::A]));
        assert!(!r.gui.confirm(Some("Title"), Some("Proceed?"), false));
    }

    #[test]
    fn confirm_navigation_skips_message_rows() {
        // From "No", up lands on "Yes"; another up wraps past the skipped
        // message rows back to "No".
        let mut r = rig_with(320, 240, taps(&[Keys::UP, Keys::A]));
        assert!(r.gui.confirm(None, Some("Sure?"), false));
        let mut r = rig_with(320, 240, taps(&[Keys::UP, Keys::UP, Keys::A]));
        assert!(!r.gui.confirm(None, Some("Sure?"), false));
    }

    #[test]
    fn confirm_without_message() {
        let mut r = rig_with(320, 240, taps(&[Keys::A]));
        assert!(r.gui.confirm(Some("Reset all settings?"), None, true));
    }

    #[test]
    fn cancelled_confirm_is_no() {
        let mut r = rig_with(320, 240, taps(&[Keys::B]));
        assert!(!r.gui.confirm(None, Some("Sure?"), true));
    }

    #[test]
    fn alert_returns_on_a() {
        let mut r = rig_with(320, 240, taps(&[Keys::A]));
        r.gui.alert(Some("Error"), Some("SD card could not be mounted"));
        assert_eq!(r.input.borrow().remaining(), 1);
        assert!(r.display.borrow().force_redraw_count() == 1);
    }
}
