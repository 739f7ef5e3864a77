//! 出生点检索
//!
//! 两阶段：先按 |Δx| 取最近的若干候选，再在候选中取 |Δy| 最小者。

use contracts::{Location, Transform};

/// Number of x-nearest candidates kept for the y comparison
pub const X_CANDIDATES: usize = 10;

/// Index of the spawn point closest to `target`, or `None` if there are none.
pub fn closest_spawn_point(points: &[Transform], target: Location) -> Option<usize> {
    let mut by_x: Vec<(usize, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, (p.location.x - target.x).abs()))
        .collect();
    // stable: equal |Δx| keeps map order
    by_x.sort_by(|a, b| a.1.total_cmp(&b.1));
    by_x.truncate(X_CANDIDATES);

    by_x.into_iter()
        .map(|(i, _)| (i, (points[i].location.y - target.y).abs()))
        .fold(None, |best: Option<(usize, f64)>, (i, dy)| match best {
            Some((_, best_dy)) if best_dy <= dy => best,
            _ => Some((i, dy)),
        })
        .map(|(i, _)| i)
}
