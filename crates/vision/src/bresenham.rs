use locus_common::Position;

/// Integer cells on the straight line from `from` to `to`, both inclusive,
/// on `from`'s level.
///
/// Works in every octant and never touches floating point. Only `x` and `y`
/// are traversed; `to.z` is ignored.
#[derive(Debug, Clone)]
pub struct BresenhamLine {
    x: i32,
    y: i32,
    z: i32,
    end_x: i32,
    end_y: i32,
    dx: i32,
    dy: i32,
    sx: i32,
    sy: i32,
    err: i32,
    done: bool,
}

impl BresenhamLine {
    pub fn new(from: Position, to: Position) -> Self {
        let dx = (to.x - from.x).abs();
        let dy = (to.y - from.y).abs();
        Self {
            x: from.x,
            y: from.y,
            z: from.z,
            end_x: to.x,
            end_y: to.y,
            dx,
            dy,
            sx: if from.x < to.x { 1 } else { -1 },
            sy: if from.y < to.y { 1 } else { -1 },
            err: dx - dy,
            done: false,
        }
    }
}

impl Iterator for BresenhamLine {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        if self.done {
            return None;
        }
        let current = Position::new(self.x, self.y, self.z);
        if self.x == self.end_x && self.y == self.end_y {
            self.done = true;
            return Some(current);
        }
        let e2 = 2 * self.err;
        if e2 > -self.dy {
            self.err -= self.dy;
            self.x += self.sx;
        }
        if e2 < self.dx {
            self.err += self.dx;
            self.y += self.sy;
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let left = (self.end_x - self.x).abs().max((self.end_y - self.y).abs()) as usize + 1;
        (left, Some(left))
    }
}

impl ExactSizeIterator for BresenhamLine {}

impl std::iter::FusedIterator for BresenhamLine {}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(a: (i32, i32), b: (i32, i32)) -> Vec<(i32, i32)> {
        BresenhamLine::new(Position::new(a.0, a.1, 0), Position::new(b.0, b.1, 0))
            .map(|p| (p.x, p.y))
            .collect()
    }

    #[test]
    fn horizontal_line_visits_every_cell_in_order() {
        let cells: Vec<Position> =
            BresenhamLine::new(Position::new(0, 0, 0), Position::new(3, 0, 0)).collect();
        assert_eq!(
            cells,
            vec![
                Position::new(0, 0, 0),
                Position::new(1, 0, 0),
                Position::new(2, 0, 0),
                Position::new(3, 0, 0),
            ]
        );
    }

    #[test]
    fn single_point() {
        assert_eq!(line((4, 4), (4, 4)), vec![(4, 4)]);
    }

    #[test]
    fn vertical_and_reverse() {
        assert_eq!(line((2, 3), (2, 0)), vec![(2, 3), (2, 2), (2, 1), (2, 0)]);
        assert_eq!(line((3, 0), (0, 0)), vec![(3, 0), (2, 0), (1, 0), (0, 0)]);
    }

    #[test]
    fn diagonal_steps_both_axes() {
        assert_eq!(line((0, 0), (3, 3)), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
        assert_eq!(line((0, 0), (-2, 2)), vec![(0, 0), (-1, 1), (-2, 2)]);
    }

    #[test]
    fn every_octant_is_connected_and_ends_on_target() {
        let targets = [(5, 2), (2, 5), (-2, 5), (-5, 2), (-5, -2), (-2, -5), (2, -5), (5, -2)];
        for t in targets {
            let cells = line((0, 0), t);
            assert_eq!(cells.first(), Some(&(0, 0)));
            assert_eq!(cells.last(), Some(&t));
            assert_eq!(cells.len(), 6);
            for w in cells.windows(2) {
                assert!((w[0].0 - w[1].0).abs() <= 1 && (w[0].1 - w[1].1).abs() <= 1);
            }
        }
    }

    #[test]
    fn size_hint_is_exact() {
        let mut it = BresenhamLine::new(Position::new(0, 0, 0), Position::new(5, 2, 0));
        assert_eq!(it.len(), 6);
        it.next();
        assert_eq!(it.len(), 5);
        let rest: Vec<_> = it.by_ref().collect();
        assert_eq!(rest.len(), 5);
        assert_eq!(it.len(), 0);
    }

    #[test]
    fn level_comes_from_start() {
        let cells: Vec<Position> =
            BresenhamLine::new(Position::new(0, 0, 2), Position::new(2, 0, 7)).collect();
        assert!(cells.iter().all(|p| p.z == 2));
    }
}
