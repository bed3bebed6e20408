//! NSGA-II driver
//!
//! Elitist generational loop: binary tournament mating, SBX crossover,
//! polynomial mutation, duplicate elimination, then rank-and-crowding
//! survival over parents plus offspring. Objective evaluation is the only
//! parallel step; all random draws happen on one seeded stream in a fixed
//! order, so a run depends on nothing but its seed.

use crate::config::OptimizerConfig;
use crate::core_types::seed::{stream_rng, streams};
use crate::optimizer::operators::{binary_tournament, polynomial_mutation, random_genes, sbx};
use crate::optimizer::population::{rank_population, survive, Individual};
use crate::optimizer::problem::{MultiObjectiveProblem, Objectives};
use rand::rngs::StdRng;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

/// Offspring generation retries before accepting a short batch
const MAX_MATING_ATTEMPTS: usize = 100;

/// One non-dominated decision vector and its objectives
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Decision vector
    pub genes: Vec<f64>,
    /// Minimised objectives
    pub objectives: Objectives,
}

/// Rank-0 members of the final population, in population order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParetoFront {
    solutions: Vec<Solution>,
}

impl ParetoFront {
    /// Front from explicit solutions
    pub fn new(solutions: Vec<Solution>) -> Self {
        Self { solutions }
    }

    /// Solutions on the front
    #[must_use]
    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    /// Objective vectors of the front
    pub fn objectives(&self) -> Vec<Objectives> {
        self.solutions.iter().map(|s| s.objectives).collect()
    }

    /// Number of solutions
    #[must_use]
    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    /// Whether the front is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }
}

/// Seeded NSGA-II over a box-bounded problem
#[derive(Debug, Clone)]
pub struct Nsga2 {
    population_size: usize,
    generations: usize,
    crossover_prob: f64,
    crossover_eta: f64,
    mutation_eta: f64,
    eliminate_duplicates: bool,
    seed: u64,
}

impl Nsga2 {
    /// Algorithm with the optimizer's search settings
    pub fn new(config: &OptimizerConfig) -> Self {
        Self {
            population_size: config.population_size,
            generations: config.generations,
            crossover_prob: config.crossover_prob,
            crossover_eta: config.crossover_eta,
            mutation_eta: config.mutation_eta,
            eliminate_duplicates: config.eliminate_duplicates,
            seed: config.seed,
        }
    }

    /// Evolve a population and return its first front
    ///
    /// A problem without variables has a single possible decision; its front
    /// is that one solution.
    pub fn run<P: MultiObjectiveProblem>(&self, problem: &P) -> ParetoFront {
        debug_assert!(self.population_size >= 2, "population validated by OptimizerConfig");
        let n_var = problem.n_var();
        if n_var == 0 {
            return ParetoFront::new(vec![Solution {
                genes: Vec::new(),
                objectives: problem.evaluate(&[]),
            }]);
        }
        let bounds = problem.bounds();
        let mut rng = stream_rng(self.seed, streams::EVOLUTION);

        info!(
            "NSGA-II: {} variables, population {}, {} generations",
            n_var, self.population_size, self.generations
        );

        let mut seen = FxHashSet::default();
        let initial: Vec<Vec<f64>> = (0..self.population_size)
            .map(|_| random_genes(n_var, bounds, &mut rng))
            .filter(|g| !self.eliminate_duplicates || seen.insert(gene_key(g)))
            .collect();
        let mut population = evaluate(problem, initial);
        rank_population(&mut population);

        for generation in 0..self.generations {
            let offspring = self.mate(&population, bounds, &mut rng);
            if offspring.is_empty() {
                debug!("NSGA-II: no new offspring in generation {}, stopping", generation + 1);
                break;
            }
            let mut merged = population;
            merged.extend(evaluate(problem, offspring));
            population = survive(merged, self.population_size);
            debug!(
                "NSGA-II generation {}/{}: {} on the first front",
                generation + 1,
                self.generations,
                population.iter().filter(|ind| ind.rank == 0).count()
            );
        }

        let front = ParetoFront::new(
            population
                .into_iter()
                .filter(|ind| ind.rank == 0)
                .map(|ind| Solution {
                    genes: ind.genes,
                    objectives: ind.objectives,
                })
                .collect(),
        );
        info!("NSGA-II: front of {} solutions", front.len());
        front
    }

    /// Produce up to one population's worth of new decision vectors
    fn mate(&self, population: &[Individual], bounds: (f64, f64), rng: &mut StdRng) -> Vec<Vec<f64>> {
        let target = self.population_size;
        let mut seen: FxHashSet<Vec<u64>> = if self.eliminate_duplicates {
            population.iter().map(|ind| gene_key(&ind.genes)).collect()
        } else {
            FxHashSet::default()
        };

        let mut offspring = Vec::with_capacity(target);
        let mut attempts = 0;
        while offspring.len() < target && attempts < MAX_MATING_ATTEMPTS {
            attempts += 1;
            let pairs = (target - offspring.len()).div_ceil(2);
            for _ in 0..pairs {
                let a = binary_tournament(population, rng);
                let b = binary_tournament(population, rng);
                let (mut c1, mut c2) = sbx(
                    &population[a].genes,
                    &population[b].genes,
                    self.crossover_prob,
                    self.crossover_eta,
                    bounds,
                    rng,
                );
                polynomial_mutation(&mut c1, self.mutation_eta, bounds, rng);
                polynomial_mutation(&mut c2, self.mutation_eta, bounds, rng);
                for child in [c1, c2] {
                    if offspring.len() < target
                        && (!self.eliminate_duplicates || seen.insert(gene_key(&child)))
                    {
                        offspring.push(child);
                    }
                }
            }
        }
        offspring
    }
}

fn gene_key(genes: &[f64]) -> Vec<u64> {
    genes.iter().map(|g| g.to_bits()).collect()
}

fn evaluate<P: MultiObjectiveProblem>(problem: &P, genes: Vec<Vec<f64>>) -> Vec<Individual> {
    genes
        .into_par_iter()
        .map(|g| {
            let objectives = problem.evaluate(&g);
            Individual::new(g, objectives)
        })
        .collect()
}
