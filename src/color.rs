//! Palette entries and the RGB to CIELAB conversion used to enrich them.

use core::ops::Deref;

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

/// D65 reference white.
const WHITE_X: f64 = 0.95047;
const WHITE_Y: f64 = 1.0;
const WHITE_Z: f64 = 1.08883;

/// `6/29`, the knee of the CIE transfer function.
const DELTA: f64 = 6.0 / 29.0;

/// A color in CIE L*a*b* space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

#[inline]
fn srgb_to_linear(channel: u8) -> f64 {
    let v = f64::from(channel) / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn cie_f(t: f64) -> f64 {
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

/// Convert an 8-bit sRGB triple to CIELAB under D65.
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> Lab {
    let (r, g, b) = (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));

    let x = 0.4124564 * r + 0.3575761 * g + 0.1804375 * b;
    let y = 0.2126729 * r + 0.7151522 * g + 0.0721750 * b;
    let z = 0.0193339 * r + 0.1191920 * g + 0.9503041 * b;

    let fx = cie_f(x / WHITE_X);
    let fy = cie_f(y / WHITE_Y);
    let fz = cie_f(z / WHITE_Z);

    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// One palette entry.
///
/// Only constructible from RGB, so the Lab and hex forms never drift from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Color {
    rgb: Rgb888,
    lab: Lab,
    hex: String,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self {
            rgb: Rgb888::new(r, g, b),
            lab: rgb_to_lab(r, g, b),
            hex: format!("#{:02x}{:02x}{:02x}", r, g, b),
        }
    }

    pub fn rgb(&self) -> Rgb888 {
        self.rgb
    }

    pub fn lab(&self) -> Lab {
        self.lab
    }

    /// Lowercase `#rrggbb`.
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl From<Rgb888> for Color {
    fn from(rgb: Rgb888) -> Self {
        Color::new(rgb.r(), rgb.g(), rgb.b())
    }
}

/// A global or local palette. Position in the table is the palette index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorTable {
    table: Vec<Color>,
}

impl ColorTable {
    /// Decode consecutive RGB triples. A trailing partial triple is dropped.
    pub fn from_rgb_bytes(raw: &[u8]) -> Self {
        let table = raw
            .chunks_exact(3)
            .map(|rgb| Color::new(rgb[0], rgb[1], rgb[2]))
            .collect();
        Self { table }
    }
}

impl Deref for ColorTable {
    type Target = [Color];

    fn deref(&self) -> &[Color] {
        &self.table
    }
}

impl<'a> IntoIterator for &'a ColorTable {
    type Item = &'a Color;
    type IntoIter = core::slice::Iter<'a, Color>;

    fn into_iter(self) -> Self::IntoIter {
        self.table.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn white_is_full_lightness() {
        let lab = rgb_to_lab(255, 255, 255);
        assert!(close(lab.l, 100.0, 0.5), "{:?}", lab);
        assert!(close(lab.a, 0.0, 0.5), "{:?}", lab);
        assert!(close(lab.b, 0.0, 0.5), "{:?}", lab);
    }

    #[test]
    fn black_is_origin() {
        let lab = rgb_to_lab(0, 0, 0);
        assert!(close(lab.l, 0.0, 1e-9), "{:?}", lab);
        assert!(close(lab.a, 0.0, 1e-9), "{:?}", lab);
        assert!(close(lab.b, 0.0, 1e-9), "{:?}", lab);
    }

    #[test]
    fn primaries() {
        // Reference values for sRGB primaries under D65.
        let red = rgb_to_lab(255, 0, 0);
        assert!(close(red.l, 53.24, 0.1) && close(red.a, 80.09, 0.1) && close(red.b, 67.20, 0.1));
        let green = rgb_to_lab(0, 255, 0);
        assert!(close(green.l, 87.73, 0.1) && close(green.a, -86.18, 0.1));
        let blue = rgb_to_lab(0, 0, 255);
        assert!(close(blue.l, 32.30, 0.1) && close(blue.b, -107.86, 0.1));
    }

    #[test]
    fn hex_is_zero_padded() {
        assert_eq!(Color::new(1, 2, 255).hex(), "#0102ff");
        assert_eq!(Color::new(0, 0, 0).hex(), "#000000");
        assert_eq!(Color::new(0xAB, 0xCD, 0xEF).hex(), "#abcdef");
    }

    #[test]
    fn table_keeps_order() {
        let table = ColorTable::from_rgb_bytes(&[255, 0, 0, 0, 255, 0, 0, 0, 255]);
        assert_eq!(table.len(), 3);
        assert_eq!(table[0].rgb(), Rgb888::RED);
        assert_eq!(table[1].rgb(), Rgb888::GREEN);
        assert_eq!(table[2].rgb(), Rgb888::BLUE);
    }

    #[test]
    fn partial_triple_dropped() {
        let table = ColorTable::from_rgb_bytes(&[1, 2, 3, 4, 5]);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].hex(), "#010203");
    }

    quickcheck! {
        fn table_len_follows_raw_len(raw: Vec<u8>) -> bool {
            ColorTable::from_rgb_bytes(&raw).len() == raw.len() / 3
        }

        fn lightness_stays_in_range(r: u8, g: u8, b: u8) -> bool {
            let lab = rgb_to_lab(r, g, b);
            lab.l >= -1e-9 && lab.l <= 100.0 + 1e-3
        }

        fn grays_are_neutral(v: u8) -> bool {
            let lab = rgb_to_lab(v, v, v);
            lab.a.abs() < 0.01 && lab.b.abs() < 0.01
        }

        fn lab_follows_rgb(r: u8, g: u8, b: u8) -> bool {
            Color::new(r, g, b).lab() == rgb_to_lab(r, g, b)
        }
    }
}
