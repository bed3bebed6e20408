//! Compromise selection on a Pareto front
//!
//! The score of a solution is
//! `(U - min U)^2 + (A - min A)^2 - (C - max C)^2`
//! over CO2 potential `C`, uncertainty `U` and ALAN risk `A`. The CO2 term is
//! subtracted, so a solution far below the best CO2 scores lower, not higher.
//! Downstream reports were produced with this scoring and it is kept as is.

use nalgebra::Vector3;

/// Index of the compromise solution among `(CO2, uncertainty, ALAN)` rows
///
/// # Returns
///
/// `None` for an empty front; the first minimiser on ties.
pub fn compromise_index(rows: &[Vector3<f64>]) -> Option<usize> {
    let first = rows.first()?;
    let (mut max_c, mut min_u, mut min_a) = (first.x, first.y, first.z);
    for r in rows {
        max_c = max_c.max(r.x);
        min_u = min_u.min(r.y);
        min_a = min_a.min(r.z);
    }

    let mut best = 0;
    let mut best_score = f64::INFINITY;
    for (i, r) in rows.iter().enumerate() {
        let score = (r.y - min_u).powi(2) + (r.z - min_a).powi(2) - (r.x - max_c).powi(2);
        if score < best_score {
            best = i;
            best_score = score;
        }
    }
    Some(best)
}
