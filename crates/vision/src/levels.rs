use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The set of z-levels a viewer may draw or query around its own level.
///
/// Sight itself never crosses levels; this only bounds which levels a
/// renderer or inspector should consider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleLevels {
    levels: BTreeSet<i32>,
    min_level: i32,
    max_level: i32,
    z_view_range: i32,
}

impl VisibleLevels {
    /// Levels `center - range ..= center + range`.
    pub fn from_center(center: i32, range: i32) -> Self {
        let range = range.max(0);
        Self {
            levels: (center - range..=center + range).collect(),
            min_level: center - range,
            max_level: center + range,
            z_view_range: range,
        }
    }

    /// Every level of a grid `depth` deep.
    pub fn all(depth: i32) -> Self {
        if depth <= 0 {
            return Self::none();
        }
        Self {
            levels: (0..depth).collect(),
            min_level: 0,
            max_level: depth - 1,
            z_view_range: depth - 1,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, level: i32) -> bool {
        self.levels.contains(&level)
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> impl Iterator<Item = i32> + '_ {
        self.levels.iter().copied()
    }

    pub fn min_level(&self) -> i32 {
        self.min_level
    }

    pub fn max_level(&self) -> i32 {
        self.max_level
    }

    pub fn z_view_range(&self) -> i32 {
        self.z_view_range
    }

    /// Drop levels outside `0..depth`.
    pub fn clamp_to(&self, depth: i32) -> Self {
        let levels: BTreeSet<i32> = self
            .levels
            .iter()
            .copied()
            .filter(|z| (0..depth).contains(z))
            .collect();
        match (levels.first().copied(), levels.last().copied()) {
            (Some(min_level), Some(max_level)) => Self {
                levels,
                min_level,
                max_level,
                z_view_range: self.z_view_range,
            },
            _ => Self::none(),
        }
    }
}
