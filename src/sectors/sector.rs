//! A space sector: integer coordinates relative to Earth plus the derived sector code.

use std::fmt;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Code of the sector at the origin. Both indexes use it as the start of every stellar path.
pub const REFERENCE_CODE: &str = "0SSS";

/// Composite sort key of a sector: x, then y, then z.
pub type SectorKey = (i32, i32, i32);

/// Node color used by the balanced index. Absent children count as black.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub fn flipped(self) -> Self {
        match self {
            Color::Red => Color::Black,
            Color::Black => Color::Red,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => f.write_str("RED"),
            Color::Black => f.write_str("BLACK"),
        }
    }
}

/// Sector data. `distance` and `code` are computed once in [`Sector::new`] and travel with the
/// coordinates; they are never recomputed.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sector {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub distance: f64,
    pub code: String,
}

impl Sector {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        let (fx, fy, fz) = (f64::from(x), f64::from(y), f64::from(z));
        let distance = (fx * fx + fy * fy + fz * fz).sqrt();
        let code = sector_code(distance, x, y, z);
        Sector { x, y, z, distance, code }
    }

    pub fn key(&self) -> SectorKey {
        (self.x, self.y, self.z)
    }

    pub fn is_reference(&self) -> bool {
        self.code == REFERENCE_CODE
    }
}

impl PartialEq for Sector {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Sector {}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

fn axis_letter(value: i32, positive: char, negative: char) -> char {
    match value.signum() {
        0 => 'S',
        1 => positive,
        _ => negative,
    }
}

/// `<truncated distance><x: S|R|L><y: S|U|D><z: S|F|B>`
fn sector_code(distance: f64, x: i32, y: i32, z: i32) -> String {
    format!(
        "{}{}{}{}",
        distance as i64,
        axis_letter(x, 'R', 'L'),
        axis_letter(y, 'U', 'D'),
        axis_letter(z, 'F', 'B'),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_origin_is_reference() {
        let origin = Sector::new(0, 0, 0);
        assert_eq!(origin.code, REFERENCE_CODE);
        assert!(origin.is_reference());
        assert_relative_eq!(origin.distance, 0.0);
    }

    #[test]
    fn test_code_letters_per_axis() {
        assert_eq!(Sector::new(3, 4, 0).code, "5RUS");
        assert_eq!(Sector::new(-3, 4, 0).code, "5LUS");
        assert_eq!(Sector::new(0, -3, -4).code, "5SDB");
        assert_eq!(Sector::new(0, 0, 7).code, "7SSF");
    }

    #[test]
    fn test_distance_is_truncated_in_code() {
        // sqrt(1 + 1 + 1) = 1.73...
        let s = Sector::new(1, 1, 1);
        assert_relative_eq!(s.distance, 3f64.sqrt());
        assert_eq!(s.code, "1RUF");
        // sqrt(4 + 4 + 4) = 3.46...
        assert_eq!(Sector::new(-2, -2, 2).code, "3LDF");
    }

    #[test]
    fn test_equality_uses_coordinates() {
        assert_eq!(Sector::new(1, 2, 3), Sector::new(1, 2, 3));
        assert_ne!(Sector::new(1, 2, 3), Sector::new(3, 2, 1));
        assert_eq!(Sector::new(1, 2, 3).code, Sector::new(3, 2, 1).code);
    }

    #[test]
    fn test_color_flip() {
        assert_eq!(Color::Red.flipped(), Color::Black);
        assert_eq!(Color::Black.flipped(), Color::Red);
        assert_eq!(Color::Red.to_string(), "RED");
    }
}
