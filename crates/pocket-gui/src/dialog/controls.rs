//! Built-in row behaviors for settings menus.
//!
//! Each control reads the current state from its subsystem on every event,
//! applies the change and formats the row's value. Left/right step through
//! the choices; the other events only refresh the text.

use std::cell::Cell;
use std::rc::Rc;

use pocket_types::backend::{
    Audio, AudioSink, DisplayFilter, DisplayScaling, Shared, UpdateMode, VOLUME_MAX,
};

use crate::dialog::{DialogEvent, DialogReturn, OptionBehavior};
use crate::font::{font_label, fonts};
use crate::gui::Gui;

/// Wraps a closure as a behavior with no init override.
pub struct FnBehavior<F> {
    f: F,
}

impl<F> FnBehavior<F>
where
    F: FnMut(DialogEvent, &mut String, &mut Gui) -> DialogReturn,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> OptionBehavior for FnBehavior<F>
where
    F: FnMut(DialogEvent, &mut String, &mut Gui) -> DialogReturn,
{
    fn update(&mut self, event: DialogEvent, value: &mut String, gui: &mut Gui) -> DialogReturn {
        (self.f)(event, value, gui)
    }
}

/// Step `index` through `len` choices, wrapping at both ends.
fn cycle(index: usize, len: usize, event: DialogEvent) -> usize {
    match event {
        DialogEvent::Prev => (index + len - 1) % len,
        DialogEvent::Next => (index + 1) % len,
        DialogEvent::Alt | DialogEvent::Enter => index,
    }
}

fn position<T: PartialEq>(all: &[T], current: &T) -> usize {
    all.iter().position(|x| x == current).unwrap_or(0)
}

/// Backlight in steps of 10%, kept even and within 1..=100.
pub struct BrightnessControl;

impl BrightnessControl {
    fn apply(event: Option<DialogEvent>, gui: &mut Gui) -> String {
        let display = gui.display();
        let mut display = display.borrow_mut();
        let old = display.backlight();
        let level = match event {
            Some(DialogEvent::Prev) => old - 10,
            Some(DialogEvent::Next) => old + 10,
            _ => old,
        };
        let level = (level & !1).clamp(1, 100);
        if level != old {
            display.set_backlight(level);
        }
        format!("{level}%")
    }
}

impl OptionBehavior for BrightnessControl {
    fn init(&mut self, gui: &mut Gui) -> Option<String> {
        Some(Self::apply(None, gui))
    }

    fn update(&mut self, event: DialogEvent, value: &mut String, gui: &mut Gui) -> DialogReturn {
        *value = Self::apply(Some(event), gui);
        DialogReturn::Ignore
    }
}

/// Audio volume, shown as a percentage.
pub struct VolumeControl {
    audio: Shared<dyn Audio>,
}

impl VolumeControl {
    pub fn new(audio: Shared<dyn Audio>) -> Self {
        Self { audio }
    }

    fn apply(&self, event: Option<DialogEvent>) -> String {
        let mut audio = self.audio.borrow_mut();
        let old = audio.volume();
        let level = match event {
            Some(DialogEvent::Prev) => old - 1,
            Some(DialogEvent::Next) => old + 1,
            _ => old,
        };
        let level = level.clamp(0, VOLUME_MAX);
        if level != old {
            audio.set_volume(level);
        }
        format!("{}%", level * VOLUME_MAX)
    }
}

impl OptionBehavior for VolumeControl {
    fn init(&mut self, _gui: &mut Gui) -> Option<String> {
        Some(self.apply(None))
    }

    fn update(&mut self, event: DialogEvent, value: &mut String, _gui: &mut Gui) -> DialogReturn {
        *value = self.apply(Some(event));
        DialogReturn::Ignore
    }
}

/// Toggles between the speaker and the external DAC.
pub struct AudioOutControl {
    audio: Shared<dyn Audio>,
}

impl AudioOutControl {
    pub fn new(audio: Shared<dyn Audio>) -> Self {
        Self { audio }
    }
}

impl OptionBehavior for AudioOutControl {
    fn init(&mut self, _gui: &mut Gui) -> Option<String> {
        Some(self.audio.borrow().sink().label().to_string())
    }

    fn update(&mut self, event: DialogEvent, value: &mut String, _gui: &mut Gui) -> DialogReturn {
        let mut audio = self.audio.borrow_mut();
        let mut sink = audio.sink();
        if matches!(event, DialogEvent::Prev | DialogEvent::Next) {
            sink = match sink {
                AudioSink::Speaker => AudioSink::ExternalDac,
                AudioSink::ExternalDac => AudioSink::Speaker,
            };
            audio.set_sink(sink);
        }
        *value = sink.label().to_string();
        DialogReturn::Ignore
    }
}

pub struct FilterControl;

impl OptionBehavior for FilterControl {
    fn init(&mut self, gui: &mut Gui) -> Option<String> {
        Some(gui.display().borrow().filter().label().to_string())
    }

    fn update(&mut self, event: DialogEvent, value: &mut String, gui: &mut Gui) -> DialogReturn {
        let display = gui.display();
        let mut display = display.borrow_mut();
        let all = DisplayFilter::ALL;
        let mode = all[cycle(position(&all, &display.filter()), all.len(), event)];
        if mode != display.filter() {
            display.set_filter(mode);
        }
        *value = mode.label().to_string();
        DialogReturn::Ignore
    }
}

pub struct ScalingControl;

impl OptionBehavior for ScalingControl {
    fn init(&mut self, gui: &mut Gui) -> Option<String> {
        Some(gui.display().borrow().scaling().label().to_string())
    }

    fn update(&mut self, event: DialogEvent, value: &mut String, gui: &mut Gui) -> DialogReturn {
        let display = gui.display();
        let mut display = display.borrow_mut();
        let all = DisplayScaling::ALL;
        let mode = all[cycle(position(&all, &display.scaling()), all.len(), event)];
        if mode != display.scaling() {
            display.set_scaling(mode);
        }
        *value = mode.label().to_string();
        DialogReturn::Ignore
    }
}

pub struct UpdateModeControl;

impl OptionBehavior for UpdateModeControl {
    fn init(&mut self, gui: &mut Gui) -> Option<String> {
        Some(gui.display().borrow().update_mode().label().to_string())
    }

    fn update(&mut self, event: DialogEvent, value: &mut String, gui: &mut Gui) -> DialogReturn {
        let display = gui.display();
        let mut display = display.borrow_mut();
        let all = UpdateMode::ALL;
        let mode = all[cycle(position(&all, &display.update_mode()), all.len(), event)];
        if mode != display.update_mode() {
            display.set_update_mode(mode);
        }
        *value = mode.label().to_string();
        DialogReturn::Ignore
    }
}

/// Emulation speed multiplier: 1x, 2x or 3x.
pub struct SpeedControl {
    speedup: Rc<Cell<u8>>,
}

impl SpeedControl {
    pub const STEPS: usize = 3;

    pub fn new(speedup: Rc<Cell<u8>>) -> Self {
        Self { speedup }
    }
}

impl OptionBehavior for SpeedControl {
    fn init(&mut self, _gui: &mut Gui) -> Option<String> {
        Some(format!("{}x", self.speedup.get() + 1))
    }

    fn update(&mut self, event: DialogEvent, value: &mut String, _gui: &mut Gui) -> DialogReturn {
        let current = usize::from(self.speedup.get()).min(Self::STEPS - 1);
        let next = cycle(current, Self::STEPS, event) as u8;
        self.speedup.set(next);
        *value = format!("{}x", next + 1);
        DialogReturn::Ignore
    }
}

/// Cycles the GUI font; the new font is persisted by [`Gui::set_font_type`].
pub struct FontTypeControl;

impl OptionBehavior for FontTypeControl {
    fn init(&mut self, gui: &mut Gui) -> Option<String> {
        Some(font_label(gui.font_info().font_type))
    }

    fn update(&mut self, event: DialogEvent, value: &mut String, gui: &mut Gui) -> DialogReturn {
        let current = gui.font_info().font_type;
        let next = cycle(current, fonts().len(), event);
        if next != current {
            gui.set_font_type(next as i32);
        }
        *value = font_label(gui.font_info().font_type);
        DialogReturn::Ignore
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::{DialogOption, OptionList};
    use crate::gui::tests::{Rig, rig_with};
    use pocket_types::backend::shared;
    use pocket_types::input::Keys;
    use pocket_types::test_utils::MockAudio;

    fn rig(script: Vec<Keys>) -> Rig {
        rig_with(320, 240, script)
    }

    fn run(r: &mut Rig, behavior: impl OptionBehavior + 'static) -> Option<i32> {
        let mut list = OptionList::new();
        list.push(DialogOption::new(1, "Row").with_value("?").with_behavior(behavior))
            .unwrap();
        r.gui.dialog(Some("Options"), list, 0)
    }

    fn taps(keys: &[Keys]) -> Vec<Keys> {
        keys.iter().flat_map(|&k| [k, Keys::NONE]).collect()
    }

    #[test]
    fn cycle_wraps() {
        assert_eq!(cycle(0, 4, DialogEvent::Prev), 3);
        assert_eq!(cycle(3, 4, DialogEvent::Next), 0);
        assert_eq!(cycle(2, 4, DialogEvent::Enter), 2);
    }

    #[test]
    fn brightness_steps_and_clamps() {
        let mut r = rig(taps(&[Keys::RIGHT, Keys::RIGHT, Keys::RIGHT, Keys::B]));
        run(&mut r, BrightnessControl);
        assert_eq!(r.display.borrow().backlight, 100);

        let mut r = rig(taps(&[Keys::LEFT; 12].iter().copied().chain([Keys::B]).collect::<Vec<_>>()));
        run(&mut r, BrightnessControl);
        assert_eq!(r.display.borrow().backlight, 1);
    }

    #[test]
    fn brightness_label() {
        let mut r = rig(Vec::new());
        assert_eq!(BrightnessControl.init(&mut r.gui).as_deref(), Some("80%"));
        let mut value = String::new();
        BrightnessControl.update(DialogEvent::Prev, &mut value, &mut r.gui);
        assert_eq!(value, "70%");
    }

    #[test]
    fn volume_bounded() {
        let audio = shared(MockAudio::new());
        let mut r = rig(taps(&[Keys::RIGHT; 8].iter().copied().chain([Keys::B]).collect::<Vec<_>>()));
        run(&mut r, VolumeControl::new(Rc::clone(&audio) as Shared<dyn Audio>));
        assert_eq!(audio.borrow().volume, VOLUME_MAX);

        let mut value = String::new();
        let mut control = VolumeControl::new(Rc::clone(&audio) as Shared<dyn Audio>);
        control.update(DialogEvent::Prev, &mut value, &mut r.gui);
        assert_eq!(value, "90%");
    }

    #[test]
    fn audio_out_toggles() {
        let audio = shared(MockAudio::new());
        let mut r = rig(taps(&[Keys::RIGHT, Keys::B]));
        run(&mut r, AudioOutControl::new(Rc::clone(&audio) as Shared<dyn Audio>));
        assert_eq!(audio.borrow().sink, AudioSink::ExternalDac);
    }

    #[test]
    fn display_modes_cycle() {
        let mut r = rig(taps(&[Keys::LEFT, Keys::B]));
        run(&mut r, FilterControl);
        assert_eq!(r.display.borrow().filter, DisplayFilter::Both);

        let mut r = rig(taps(&[Keys::RIGHT, Keys::B]));
        run(&mut r, ScalingControl);
        assert_eq!(r.display.borrow().scaling, DisplayScaling::Fill);

        let mut r = rig(taps(&[Keys::RIGHT, Keys::B]));
        run(&mut r, UpdateModeControl);
        assert_eq!(r.display.borrow().update_mode, UpdateMode::Full);
    }

    #[test]
    fn speed_wraps() {
        let speed = Rc::new(Cell::new(0));
        let mut r = rig(taps(&[Keys::LEFT, Keys::B]));
        run(&mut r, SpeedControl::new(Rc::clone(&speed)));
        assert_eq!(speed.get(), 2);

        let mut value = String::new();
        let mut control = SpeedControl::new(Rc::clone(&speed));
        control.update(DialogEvent::Next, &mut value, &mut r.gui);
        assert_eq!((speed.get(), value.as_str()), (0, "1x"));
    }

    #[test]
    fn font_type_cycles_and_persists() {
        let mut r = rig(taps(&[Keys::RIGHT, Keys::B]));
        run(&mut r, FontTypeControl);
        assert_eq!(r.gui.font_info().font_type, 1);
        assert_eq!(r.settings.borrow().ints.get(crate::gui::SETTING_FONT_TYPE), Some(&1));
    }

    #[test]
    fn enter_only_refreshes() {
        let mut r = rig(Vec::new());
        let mut value = String::new();
        FilterControl.update(DialogEvent::Enter, &mut value, &mut r.gui);
        assert_eq!(value, "Off");
        assert_eq!(r.display.borrow().filter, DisplayFilter::Off);
    }
}
