//! ASCII renderings of one grid level, one character per cell, rows
//! joined by `\n` with `y = 0` on top.

use locus_atmos::Atmosphere;
use locus_common::Position;
use locus_kernel::{Role, SpatialGrid};
use locus_vision::{LineOfSight, Shade};
use std::collections::BTreeMap;

const EMPTY: char = '.';
const UNSEEN: char = ' ';

/// Character for an occupant with the given roles, most specific first.
pub fn glyph_for(roles: &[Role]) -> char {
    const ORDER: [(Role, char); 8] = [
        (Role::Mob, 'm'),
        (Role::Item, 'i'),
        (Role::Wall, '#'),
        (Role::Structure, 's'),
        (Role::Opaque, '#'),
        (Role::Destroyed, 'x'),
        (Role::Floor, '_'),
        (Role::Turf, '_'),
    ];
    ORDER
        .iter()
        .find(|(role, _)| roles.contains(role))
        .map_or('o', |(_, glyph)| *glyph)
}

fn render(grid: &SpatialGrid, z: i32, mut cell: impl FnMut(Position) -> char) -> String {
    (0..grid.height())
        .map(|y| (0..grid.width()).map(|x| cell(Position::new(x, y, z))).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Occupancy of level `z`. Levels outside the grid render as empty.
pub fn render_level(grid: &SpatialGrid, z: i32) -> String {
    render(grid, z, |pos| {
        if grid.occupied(pos) {
            glyph_for(grid.roles_at(pos))
        } else {
            EMPTY
        }
    })
}

/// What a viewer at `center` sees within `range`: `@` for the viewer,
/// occupant glyphs or `.` for seen cells, blank for everything else.
pub fn render_visibility(
    grid: &SpatialGrid,
    los: &LineOfSight,
    center: Position,
    range: i32,
) -> String {
    let shaded: BTreeMap<Position, Shade> = los
        .visible_cells_shaded(center, range, grid)
        .into_iter()
        .collect();
    render(grid, center.z, |pos| match shaded.get(&pos) {
        Some(Shade::Origin) => '@',
        Some(Shade::Blocking) => glyph_for(grid.roles_at(pos)),
        Some(Shade::Visible) if grid.occupied(pos) => glyph_for(grid.roles_at(pos)),
        Some(Shade::Visible) => EMPTY,
        None => UNSEEN,
    })
}

/// Atmosphere state of level `z`: `^` burning, `~` smoky, `|` sealed,
/// `.` tracked, blank untracked.
pub fn render_atmosphere(grid: &SpatialGrid, atmos: &Atmosphere, z: i32) -> String {
    render(grid, z, |pos| match atmos.get(pos) {
        Some(tile) if tile.on_fire() => '^',
        Some(tile) if tile.is_sealed() => '|',
        Some(tile) if tile.smoky() => '~',
        Some(_) => EMPTY,
        None => UNSEEN,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use locus_atmos::{GasMixture, GasType};
    use locus_common::{EntityId, Identity};
    use locus_kernel::Entity;

    fn entity(id: u64, roles: &[Role]) -> Entity {
        roles.iter().fold(
            Entity::new(Identity::new(EntityId(id), "object"), "thing"),
            |e, r| e.with_role(*r),
        )
    }

    #[test]
    fn glyph_precedence() {
        assert_eq!(glyph_for(&[]), 'o');
        assert_eq!(glyph_for(&[Role::Opaque, Role::Wall]), '#');
        assert_eq!(glyph_for(&[Role::Item, Role::Opaque]), 'i');
        assert_eq!(glyph_for(&[Role::Floor]), '_');
    }

    #[test]
    fn level_rows_top_down() {
        let mut grid = SpatialGrid::new("g", 3, 2, 1).expect("grid");
        grid.set(Position::new(2, 1, 0), Some(&mut entity(1, &[Role::Wall])));
        grid.set(Position::new(0, 0, 0), Some(&mut entity(2, &[Role::Mob])));
        assert_eq!(render_level(&grid, 0), "m..\n..#");
    }

    #[test]
    fn visibility_overlay_hides_cells_behind_walls() {
        let mut grid = SpatialGrid::new("g", 5, 1, 1).expect("grid");
        grid.set(Position::new(2, 0, 0), Some(&mut entity(1, &[Role::Opaque, Role::Wall])));
        let view = render_visibility(&grid, &LineOfSight::default(), Position::new(0, 0, 0), 4);
        assert_eq!(view, "@.#  ");
    }

    #[test]
    fn atmosphere_overlay() {
        let grid = SpatialGrid::new("g", 4, 1, 1).expect("grid");
        let mut atmos = Atmosphere::default();
        atmos.tile(Position::new(0, 0, 0));
        atmos.tile(Position::new(1, 0, 0)).set_sealed(true);
        let mut smoke = GasMixture::default();
        smoke.add(GasType::CarbonDioxide, 5.0);
        atmos.tile(Position::new(2, 0, 0)).air_mut().merge(&smoke);
        atmos
            .tile(Position::new(3, 0, 0))
            .air_mut()
            .add(GasType::Plasma, 2.0);
        atmos.ignite(Position::new(3, 0, 0));
        assert_eq!(render_atmosphere(&grid, &atmos, 0), ".|~^");
    }
}
