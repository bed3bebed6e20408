//! Individuals, Pareto dominance and NSGA-II survival ranking

use crate::optimizer::problem::Objectives;
use std::cmp::Ordering;

/// One member of the evolving population
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    /// Decision vector
    pub genes: Vec<f64>,
    /// Minimised objectives
    pub objectives: Objectives,
    /// Non-domination rank (0 = first front)
    pub rank: usize,
    /// Crowding distance within its front
    pub crowding: f64,
}

impl Individual {
    /// Unranked individual
    pub fn new(genes: Vec<f64>, objectives: Objectives) -> Self {
        Self {
            genes,
            objectives,
            rank: usize::MAX,
            crowding: 0.0,
        }
    }
}

/// Whether `a` Pareto-dominates `b` under minimisation
#[inline]
pub fn dominates(a: &Objectives, b: &Objectives) -> bool {
    let mut strictly_better = false;
    for (x, y) in a.iter().zip(b.iter()) {
        if x > y {
            return false;
        }
        if x < y {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Fast non-dominated sort
///
/// Returns the fronts in rank order, each a list of indices into `objectives`
/// in ascending index order.
pub fn non_dominated_sort(objectives: &[Objectives]) -> Vec<Vec<usize>> {
    let n = objectives.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut counts = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if dominates(&objectives[i], &objectives[j]) {
                dominated_by[i].push(j);
                counts[j] += 1;
            } else if dominates(&objectives[j], &objectives[i]) {
                dominated_by[j].push(i);
                counts[i] += 1;
            }
        }
    }

    let mut fronts = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| counts[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            for &j in &dominated_by[i] {
                counts[j] -= 1;
                if counts[j] == 0 {
                    next.push(j);
                }
            }
        }
        next.sort_unstable();
        fronts.push(current);
        current = next;
    }
    fronts
}

/// Crowding distance of each member of one front
///
/// Fronts of at most two members get infinity, as do the boundary members of
/// every objective with a non-zero range. An objective with zero range
/// contributes nothing; the sum is averaged over the objectives.
pub fn crowding_distance(objectives: &[Objectives], front: &[usize]) -> Vec<f64> {
    let n = front.len();
    if n <= 2 {
        return vec![f64::INFINITY; n];
    }
    let mut distance = vec![0.0; n];
    let n_obj = objectives[front[0]].len();

    for m in 0..n_obj {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            objectives[front[a]][m]
                .partial_cmp(&objectives[front[b]][m])
                .unwrap_or(Ordering::Equal)
        });
        let lo = objectives[front[order[0]]][m];
        let hi = objectives[front[order[n - 1]]][m];
        let range = hi - lo;
        if range <= 0.0 {
            continue;
        }
        distance[order[0]] = f64::INFINITY;
        distance[order[n - 1]] = f64::INFINITY;
        for k in 1..(n - 1) {
            let gap = objectives[front[order[k + 1]]][m] - objectives[front[order[k - 1]]][m];
            distance[order[k]] += gap / range;
        }
    }
    for d in &mut distance {
        if d.is_finite() {
            *d /= n_obj as f64;
        }
    }
    distance
}

/// Assign rank and crowding to every individual
pub fn rank_population(population: &mut [Individual]) {
    let objectives: Vec<Objectives> = population.iter().map(|ind| ind.objectives).collect();
    for (rank, front) in non_dominated_sort(&objectives).iter().enumerate() {
        let crowding = crowding_distance(&objectives, front);
        for (k, &i) in front.iter().enumerate() {
            population[i].rank = rank;
            population[i].crowding = crowding[k];
        }
    }
}

/// NSGA-II survival comparison: lower rank first, then larger crowding
pub fn survival_order(a: &Individual, b: &Individual) -> Ordering {
    a.rank.cmp(&b.rank).then_with(|| {
        b.crowding
            .partial_cmp(&a.crowding)
            .unwrap_or(Ordering::Equal)
    })
}

/// Keep the best `size` individuals by rank then crowding
///
/// The merged population is ranked afresh; ties keep their original order.
pub fn survive(mut merged: Vec<Individual>, size: usize) -> Vec<Individual> {
    rank_population(&mut merged);
    merged.sort_by(survival_order);
    merged.truncate(size);
    merged
}
