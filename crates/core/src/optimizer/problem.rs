//! Multi-objective problem definitions

use crate::optimizer::candidates::CandidateSet;
use nalgebra::Vector3;

/// Objective value reported when a decision vector selects nothing
pub const SENTINEL: f64 = 999.0;

/// Three objectives, all minimised
pub type Objectives = Vector3<f64>;

/// A box-bounded problem with three minimised objectives
///
/// Evaluation must be a pure function of the decision vector so that
/// populations can be evaluated in parallel.
pub trait MultiObjectiveProblem: Sync {
    /// Number of decision variables
    fn n_var(&self) -> usize;

    /// Lower and upper bound shared by every variable
    fn bounds(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    /// Objective vector for one decision vector
    fn evaluate(&self, x: &[f64]) -> Objectives;
}

/// Choose a subset of candidate sites
///
/// One variable per candidate; a candidate is selected when its variable
/// exceeds the threshold. Objectives over the selected candidates are
/// `(-mean CO2 potential, mean uncertainty, mean ALAN risk)`, or the sentinel in
/// every component when nothing is selected.
#[derive(Debug, Clone)]
pub struct RestorationProblem<'a> {
    candidates: &'a CandidateSet,
    threshold: f64,
}

impl<'a> RestorationProblem<'a> {
    /// Problem over `candidates` with selection threshold `threshold`
    pub fn new(candidates: &'a CandidateSet, threshold: f64) -> Self {
        Self {
            candidates,
            threshold,
        }
    }

    /// Indices of the candidates a decision vector selects
    pub fn selected(&self, x: &[f64]) -> Vec<usize> {
        x.iter()
            .enumerate()
            .filter(|(_, &v)| v > self.threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

impl MultiObjectiveProblem for RestorationProblem<'_> {
    fn n_var(&self) -> usize {
        self.candidates.len()
    }

    fn evaluate(&self, x: &[f64]) -> Objectives {
        let mut sum = Vector3::zeros();
        let mut count = 0usize;
        for (i, &v) in x.iter().enumerate() {
            if v > self.threshold {
                let c = &self.candidates;
                sum += Vector3::new(-c.co2_potential[i], c.uncertainty[i], c.alan_risk[i]);
                count += 1;
            }
        }
        if count == 0 {
            Vector3::repeat(SENTINEL)
        } else {
            sum / count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn candidates() -> CandidateSet {
        CandidateSet::from_columns(
            vec![54.0, 54.1, 54.2],
            vec![13.3, 13.4, 13.5],
            vec![-3.0, -5.0, -10.0],
            vec![0.5, 0.4, 0.2],
            vec![0.6, 0.5, 0.1],
            vec![0.1, 0.2, 0.3],
            vec![0.15, 0.15, 0.15],
            1.2,
        )
    }

    #[test]
    fn test_empty_selection_is_sentinel() {
        let c = candidates();
        let p = RestorationProblem::new(&c, 0.8);
        assert_eq!(p.evaluate(&[0.1, 0.8, 0.5]), Vector3::repeat(SENTINEL));
    }

    #[test]
    fn test_objectives_are_means_of_selection() {
        let c = candidates();
        let p = RestorationProblem::new(&c, 0.8);
        let f = p.evaluate(&[0.9, 0.1, 0.95]);
        // CO2: 0.5*3*1.2 = 1.8 and 0.2*10*1.2 = 2.4
        assert_relative_eq!(f.x, -2.1, epsilon = 1e-12);
        assert_relative_eq!(f.y, 0.2, epsilon = 1e-12);
        assert_relative_eq!(f.z, 0.65, epsilon = 1e-12);
        assert_eq!(p.selected(&[0.9, 0.1, 0.95]), vec![0, 2]);
    }
}
