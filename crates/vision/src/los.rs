use locus_common::Position;
use locus_kernel::{Role, SpatialGrid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::bresenham::BresenhamLine;

/// Which roles block sight, and whether an opaque target hides itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub opaque: Vec<Role>,
    pub target_blocks: bool,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            opaque: vec![Role::Opaque],
            target_blocks: false,
        }
    }
}

/// How a visible cell should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shade {
    /// The viewer's own cell.
    Origin,
    /// A seen cell whose occupant blocks sight beyond it.
    Blocking,
    Visible,
}

/// Line-of-sight calculator with its own opaque role set.
///
/// Sight never crosses levels. Every cell on the ray counts, including the
/// viewer's own; the target cell counts only when `target_blocks` is set, so
/// by default a wall is visible but hides what lies behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOfSight {
    opaque: BTreeSet<Role>,
    target_blocks: bool,
}

impl Default for LineOfSight {
    fn default() -> Self {
        Self::new([Role::Opaque])
    }
}

impl LineOfSight {
    pub fn new(opaque: impl IntoIterator<Item = Role>) -> Self {
        Self {
            opaque: opaque.into_iter().collect(),
            target_blocks: false,
        }
    }

    pub fn from_config(config: &VisionConfig) -> Self {
        Self::new(config.opaque.iter().copied()).with_target_blocks(config.target_blocks)
    }

    pub fn with_target_blocks(mut self, target_blocks: bool) -> Self {
        self.target_blocks = target_blocks;
        self
    }

    pub fn opaque(&self) -> &BTreeSet<Role> {
        &self.opaque
    }

    pub fn set_opaque(&mut self, opaque: impl IntoIterator<Item = Role>) {
        self.opaque = opaque.into_iter().collect();
    }

    pub fn target_blocks(&self) -> bool {
        self.target_blocks
    }

    /// True iff the occupant of `pos` carries an opaque role.
    pub fn blocks(&self, grid: &SpatialGrid, pos: Position) -> bool {
        grid.roles_at(pos).iter().any(|r| self.opaque.contains(r))
    }

    /// The in-bounds cells on the ray from `a` to `b`, in order.
    pub fn ray(&self, a: Position, b: Position, grid: &SpatialGrid) -> Vec<Position> {
        BresenhamLine::new(a, b).filter(|p| grid.valid(*p)).collect()
    }

    pub fn los(&self, a: Position, b: Position, grid: &SpatialGrid) -> bool {
        if a.z != b.z {
            return false;
        }
        if a == b {
            return true;
        }
        BresenhamLine::new(a, b)
            .filter(|p| grid.valid(*p))
            .filter(|p| self.target_blocks || *p != b)
            .all(|p| !self.blocks(grid, p))
    }

    /// Cells within Manhattan `range` of `center` that `center` can see.
    ///
    /// Only `center`'s level is scanned since sight never crosses levels.
    /// Cost is one ray per candidate, so keep `range` small.
    pub fn visible_cells(&self, center: Position, range: i32, grid: &SpatialGrid) -> Vec<Position> {
        let range = range.max(0);
        let mut visible = Vec::new();
        if !(0..grid.depth()).contains(&center.z) {
            return visible;
        }
        // Bounding box clipped to the grid, so the scan never exceeds its area.
        let xs = center.x.saturating_sub(range).max(0)
            ..=center.x.saturating_add(range).min(grid.width() - 1);
        let ys = center.y.saturating_sub(range).max(0)
            ..=center.y.saturating_add(range).min(grid.height() - 1);
        for y in ys {
            for x in xs.clone() {
                let pos = Position::new(x, y, center.z);
                let distance = (i64::from(x) - i64::from(center.x)).abs()
                    + (i64::from(y) - i64::from(center.y)).abs();
                if distance > i64::from(range) {
                    continue;
                }
                if self.los(center, pos, grid) {
                    visible.push(pos);
                }
            }
        }
        tracing::trace!(%center, range, visible = visible.len(), "visible cells computed");
        visible
    }

    /// [`LineOfSight::visible_cells`] with each cell classified for drawing.
    pub fn visible_cells_shaded(
        &self,
        center: Position,
        range: i32,
        grid: &SpatialGrid,
    ) -> Vec<(Position, Shade)> {
        self.visible_cells(center, range, grid)
            .into_iter()
            .map(|pos| {
                let shade = if pos == center {
                    Shade::Origin
                } else if self.blocks(grid, pos) {
                    Shade::Blocking
                } else {
                    Shade::Visible
                };
                (pos, shade)
            })
            .collect()
    }
}
