//! Packed 16-bit color (5-6-5 layout).

use serde::{Deserialize, Serialize};

/// A pixel in RGB565 encoding: 5 bits red, 6 bits green, 5 bits blue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb565(pub u16);

impl Rgb565 {
    pub const BLACK: Self = Self(0x0000);
    pub const WHITE: Self = Self(0xFFFF);
    pub const NAVY: Self = Self(0x000F);
    pub const BLUE: Self = Self(0x001F);
    pub const SKY_BLUE: Self = Self(0x867D);
    pub const DIM_GRAY: Self = Self(0x6B4D);
    pub const GRAY: Self = Self(0x8410);
    pub const SILVER: Self = Self(0xC618);
    pub const RED: Self = Self(0xF800);
    pub const ORANGE: Self = Self(0xFD20);
    pub const FOREST_GREEN: Self = Self(0x2444);

    /// Quantize 8-bit channels by dropping the low bits. No dithering.
    pub const fn from_rgb888(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3))
    }

    /// Expand back to 8-bit channels by shifting. The low bits stay zero, so
    /// a trip through 565 loses at most 7 (red/blue) or 3 (green) units.
    pub const fn to_rgb888(self) -> (u8, u8, u8) {
        let r = ((self.0 >> 11) & 0x1F) << 3;
        let g = ((self.0 >> 5) & 0x3F) << 2;
        let b = (self.0 & 0x1F) << 3;
        (r as u8, g as u8, b as u8)
    }

    pub const fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    pub const fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }
}

impl From<u16> for Rgb565 {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries_quantize() {
        assert_eq!(Rgb565::from_rgb888(255, 0, 0), Rgb565::RED);
        assert_eq!(Rgb565::from_rgb888(0, 0, 255), Rgb565::BLUE);
        assert_eq!(Rgb565::from_rgb888(255, 255, 255), Rgb565::WHITE);
        assert_eq!(Rgb565::from_rgb888(0, 0, 0), Rgb565::BLACK);
    }

    #[test]
    fn expand_white() {
        assert_eq!(Rgb565::WHITE.to_rgb888(), (248, 252, 248));
    }

    #[test]
    fn packed_roundtrip_is_exact() {
        for raw in [0x0000u16, 0x1234, 0x867D, 0xFD20, 0xFFFF] {
            let (r, g, b) = Rgb565(raw).to_rgb888();
            assert_eq!(Rgb565::from_rgb888(r, g, b), Rgb565(raw));
        }
    }

    #[test]
    fn le_bytes() {
        let c = Rgb565(0xABCD);
        assert_eq!(c.to_le_bytes(), [0xCD, 0xAB]);
        assert_eq!(Rgb565::from_le_bytes([0xCD, 0xAB]), c);
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&Rgb565::NAVY).unwrap();
        assert_eq!(json, "15");
        let back: Rgb565 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Rgb565::NAVY);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn quantization_error_is_bounded(r: u8, g: u8, b: u8) {
                let (r2, g2, b2) = Rgb565::from_rgb888(r, g, b).to_rgb888();
                prop_assert!(r - r2 < 8);
                prop_assert!(g - g2 < 4);
                prop_assert!(b - b2 < 8);
            }
        }
    }
}
