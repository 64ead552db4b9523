use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six grid directions: four cardinal plus up and down.
///
/// North is `-y`, south is `+y`, east is `+x`, west is `-x`, up is `+z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::Up,
        Direction::Down,
    ];

    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub const HORIZONTAL: [Direction; 2] = [Direction::East, Direction::West];

    pub const VERTICAL: [Direction; 2] = [Direction::Up, Direction::Down];

    /// The direction pointing the other way. Applying it twice is the identity.
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    /// Unit offset `[dx, dy, dz]`.
    pub const fn vector(self) -> [i32; 3] {
        match self {
            Self::North => [0, -1, 0],
            Self::East => [1, 0, 0],
            Self::South => [0, 1, 0],
            Self::West => [-1, 0, 0],
            Self::Up => [0, 0, 1],
            Self::Down => [0, 0, -1],
        }
    }

    pub const fn is_cardinal(self) -> bool {
        !matches!(self, Self::Up | Self::Down)
    }

    /// Rotate a cardinal direction a quarter turn counter-clockwise.
    /// Up and down are returned unchanged.
    pub const fn turn_left(self) -> Self {
        match self {
            Self::North => Self::West,
            Self::West => Self::South,
            Self::South => Self::East,
            Self::East => Self::North,
            other => other,
        }
    }

    /// Rotate a cardinal direction a quarter turn clockwise.
    /// Up and down are returned unchanged.
    pub const fn turn_right(self) -> Self {
        match self {
            Self::North => Self::East,
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
            other => other,
        }
    }

    /// Inverse of [`Direction::vector`]. Anything other than a unit axis vector
    /// yields `None`.
    pub fn from_vector(vector: [i32; 3]) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.vector() == vector)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a direction name is not one of the six known names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction: {0:?}")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseDirectionError(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involution() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_ne!(d.opposite(), d);
        }
    }

    #[test]
    fn opposite_vectors_cancel() {
        for d in Direction::ALL {
            let a = d.vector();
            let b = d.opposite().vector();
            assert_eq!([a[0] + b[0], a[1] + b[1], a[2] + b[2]], [0, 0, 0]);
        }
    }

    #[test]
    fn cardinal_excludes_vertical() {
        assert!(Direction::CARDINAL.iter().all(|d| d.is_cardinal()));
        assert!(!Direction::Up.is_cardinal());
        assert!(!Direction::Down.is_cardinal());
    }

    #[test]
    fn turning_four_times_returns_home() {
        let mut d = Direction::North;
        for _ in 0..4 {
            d = d.turn_right();
        }
        assert_eq!(d, Direction::North);
        assert_eq!(Direction::North.turn_left(), Direction::West);
        assert_eq!(Direction::Up.turn_left(), Direction::Up);
    }

    #[test]
    fn from_vector_roundtrip_and_rejects_diagonals() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_vector(d.vector()), Some(d));
        }
        assert_eq!(Direction::from_vector([1, 1, 0]), None);
        assert_eq!(Direction::from_vector([0, 0, 0]), None);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("north".parse::<Direction>(), Ok(Direction::North));
        assert_eq!("SOUTH".parse::<Direction>(), Ok(Direction::South));
        assert_eq!("East".parse::<Direction>(), Ok(Direction::East));
        assert!("northeast".parse::<Direction>().is_err());
    }
}
