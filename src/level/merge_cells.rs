use std::collections::{HashMap, HashSet};

use bevy::prelude::*;
use bevy_ecs_ldtk::prelude::*;

/// Size of one IntGrid cell in world units.
pub const CELL_SIZE: f32 = 8.;

pub trait MergedCell {
    /// Inserts the merged cell's components. The given [`EntityCommands`] refers to a direct
    /// child of the level, not the layer.
    fn bundle(commands: &mut EntityCommands, center: Vec2, half_extent: Vec2);
}

/// An inclusive rectangle of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRect {
    pub left: i32,
    pub right: i32,
    pub bottom: i32,
    pub top: i32,
}

impl CellRect {
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.left + self.right + 1) as f32,
            (self.bottom + self.top + 1) as f32,
        ) * CELL_SIZE
            / 2.
    }

    pub fn half_extent(&self) -> Vec2 {
        Vec2::new(
            (self.right - self.left + 1) as f32,
            (self.top - self.bottom + 1) as f32,
        ) * CELL_SIZE
            / 2.
    }
}

/// Greedily merges cells into rectangles: each row is split into horizontal runs, and a run
/// extends the rectangle above it when it has the exact same span.
pub fn merge_cells(cells: &HashSet<IVec2>) -> Vec<CellRect> {
    let Some((min, max)) = cells.iter().fold(None, |bounds: Option<(IVec2, IVec2)>, &cell| {
        Some(match bounds {
            Some((min, max)) => (min.min(cell), max.max(cell)),
            None => (cell, cell),
        })
    }) else {
        return Vec::new();
    };

    let mut finished = Vec::new();
    // keyed by (left, right) of the run
    let mut open: HashMap<(i32, i32), CellRect> = HashMap::new();

    // one extra row so rectangles touching the top edge are closed
    for y in min.y..=max.y + 1 {
        let mut runs = Vec::new();
        let mut run_start = None;
        for x in min.x..=max.x + 1 {
            match (run_start, cells.contains(&IVec2::new(x, y))) {
                (None, true) => run_start = Some(x),
                (Some(start), false) => {
                    runs.push((start, x - 1));
                    run_start = None;
                }
                _ => (),
            }
        }

        let mut still_open = HashMap::new();
        for run in runs {
            let rect = match open.remove(&run) {
                Some(rect) => CellRect { top: y, ..rect },
                None => CellRect {
                    left: run.0,
                    right: run.1,
                    bottom: y,
                    top: y,
                },
            };
            still_open.insert(run, rect);
        }
        finished.extend(open.into_values());
        open = still_open;
    }

    finished.sort_by_key(|rect| (rect.bottom, rect.left));
    finished
}

/// [`System`] that replaces freshly spawned cells of kind `C` with one collider per merged
/// rectangle, per level.
pub fn spawn_merged_cells<C>(
    mut commands: Commands,
    q_cells: Query<(&GridCoords, &Parent), Added<C>>,
    q_layers: Query<&Parent, Without<C>>,
) where
    C: MergedCell + Component,
{
    if q_cells.is_empty() {
        return;
    }

    let mut level_cells: HashMap<Entity, HashSet<IVec2>> = HashMap::new();
    for (coords, layer) in q_cells.iter() {
        if let Ok(level) = q_layers.get(layer.get()) {
            level_cells
                .entry(level.get())
                .or_default()
                .insert(IVec2::new(coords.x, coords.y));
        }
    }

    for (level, cells) in level_cells {
        let rects = merge_cells(&cells);
        debug!(
            "Merged {} {} cells into {} colliders",
            cells.len(),
            std::any::type_name::<C>(),
            rects.len()
        );
        commands.entity(level).with_children(|level| {
            for rect in rects {
                C::bundle(&mut level.spawn_empty(), rect.center(), rect.half_extent());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(coords: &[(i32, i32)]) -> HashSet<IVec2> {
        coords.iter().map(|&(x, y)| IVec2::new(x, y)).collect()
    }

    fn area(rects: &[CellRect]) -> i32 {
        rects
            .iter()
            .map(|r| (r.right - r.left + 1) * (r.top - r.bottom + 1))
            .sum()
    }

    #[test]
    fn no_cells_no_rects() {
        assert!(merge_cells(&HashSet::new()).is_empty());
    }

    #[test]
    fn full_block_is_one_rect() {
        let block: Vec<_> = (0..4).flat_map(|x| (0..3).map(move |y| (x, y))).collect();
        assert_eq!(
            merge_cells(&cells(&block)),
            vec![CellRect {
                left: 0,
                right: 3,
                bottom: 0,
                top: 2
            }]
        );
    }

    #[test]
    fn l_shape_covers_every_cell_once() {
        // ###
        // #
        // #
        let shape = cells(&[(0, 0), (0, 1), (0, 2), (1, 2), (2, 2)]);
        let rects = merge_cells(&shape);
        assert_eq!(rects.len(), 2);
        assert_eq!(area(&rects), shape.len() as i32);
        for cell in &shape {
            let covering = rects
                .iter()
                .filter(|r| {
                    (r.left..=r.right).contains(&cell.x) && (r.bottom..=r.top).contains(&cell.y)
                })
                .count();
            assert_eq!(covering, 1, "{cell} covered {covering} times");
        }
    }

    #[test]
    fn negative_coordinates_merge() {
        let rects = merge_cells(&cells(&[(-2, -1), (-1, -1)]));
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].center(), Vec2::new(-8., -4.));
        assert_eq!(rects[0].half_extent(), Vec2::new(8., 4.));
    }
}
