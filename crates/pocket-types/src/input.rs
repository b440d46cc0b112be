//! Gamepad key masks.
//!
//! The input collaborator reports the pad as a bitmask; the dialog engine
//! and lifecycle code only ever see these masks.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A set of gamepad keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Keys(pub u32);

impl Keys {
    pub const NONE: Self = Self(0);
    pub const UP: Self = Self(1 << 0);
    pub const RIGHT: Self = Self(1 << 1);
    pub const DOWN: Self = Self(1 << 2);
    pub const LEFT: Self = Self(1 << 3);
    pub const SELECT: Self = Self(1 << 4);
    pub const START: Self = Self(1 << 5);
    pub const MENU: Self = Self(1 << 6);
    pub const OPTION: Self = Self(1 << 7);
    pub const A: Self = Self(1 << 8);
    pub const B: Self = Self(1 << 9);
    pub const ALL: Self = Self(0x3FF);

    /// True when every key in `other` is held.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// True when at least one key in `other` is held.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Keys {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Keys {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Keys {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for Keys {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

impl From<Button> for Keys {
    fn from(button: Button) -> Self {
        button.key()
    }
}

/// Physical gamepad buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    Up,
    Right,
    Down,
    Left,
    Select,
    Start,
    Menu,
    Option,
    A,
    B,
}

impl Button {
    pub const ALL: [Button; 10] = [
        Button::Up,
        Button::Right,
        Button::Down,
        Button::Left,
        Button::Select,
        Button::Start,
        Button::Menu,
        Button::Option,
        Button::A,
        Button::B,
    ];

    pub const fn key(self) -> Keys {
        match self {
            Button::Up => Keys::UP,
            Button::Right => Keys::RIGHT,
            Button::Down => Keys::DOWN,
            Button::Left => Keys::LEFT,
            Button::Select => Keys::SELECT,
            Button::Start => Keys::START,
            Button::Menu => Keys::MENU,
            Button::Option => Keys::OPTION,
            Button::A => Keys::A,
            Button::B => Keys::B,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Button::Up => "up",
            Button::Right => "right",
            Button::Down => "down",
            Button::Left => "left",
            Button::Select => "select",
            Button::Start => "start",
            Button::Menu => "menu",
            Button::Option => "option",
            Button::A => "a",
            Button::B => "b",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Button {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Button::ALL
            .into_iter()
            .find(|b| b.name() == lower)
            .ok_or_else(|| format!("unknown button: {s}"))
    }
}

/// Battery state as reported by the input collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatteryReading {
    pub percent: f32,
    pub voltage: f32,
}
