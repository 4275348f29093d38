use crate::data::Catalog;
use crate::errors::{KnapsackError, Result};
use crate::experiment::GenerationStats;
use crate::individual::Individual;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One generation of candidate packings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Population {
    pub individuals: Vec<Individual>,
}

impl Population {
    pub fn new() -> Population {
        Population {
            individuals: Vec::new(),
        }
    }

    /// Fills the population with `size` coin-flip individuals of `item_count` genes.
    pub fn generate(&mut self, size: usize, item_count: usize, rng: &mut ChaCha8Rng) {
        self.individuals
            .extend((0..size).map(|_| Individual::random(item_count, rng)));
    }

    /// Builds generation 0 from caller-supplied genes, which must all be `item_count` long.
    pub fn from_genes(genes: &[Vec<bool>], item_count: usize) -> Result<Population> {
        if let Some((n, gene)) = genes
            .iter()
            .enumerate()
            .find(|(_, g)| g.len() != item_count)
        {
            return Err(KnapsackError::invalid(format!(
                "Initial gene #{} has {} positions but item_count={}.",
                n,
                gene.len(),
                item_count
            )));
        }
        Ok(Population {
            individuals: genes
                .iter()
                .map(|g| Individual::from_genes(g.clone()))
                .collect(),
        })
    }

    pub fn add(&mut self, population: Population) {
        self.individuals.extend(population.individuals);
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Evaluates every individual on the catalog. Each evaluation is independent.
    pub fn fit(&mut self, catalog: &Catalog, capacity: f64) {
        self.individuals.par_iter_mut().for_each(|i| {
            i.evaluate(catalog, capacity);
        });
    }

    /// Fittest individual. On equal fitness a feasible one wins, then the first one seen.
    pub fn best(&self, capacity: f64) -> Option<&Individual> {
        let mut best: Option<&Individual> = None;
        for i in &self.individuals {
            match best {
                Some(b) if !i.outranks(b, capacity) => {}
                _ => best = Some(i),
            }
        }
        best
    }

    /// Aggregates the fitness of an evaluated population.
    ///
    /// `best_weight` is 0 when nothing fits, the empty packing being the best feasible one.
    pub fn stats(&self, generation_index: usize, capacity: f64) -> GenerationStats {
        let n = self.individuals.len();
        let best = self.best(capacity);
        let sum: f64 = self.individuals.iter().map(|i| i.fit).sum();
        GenerationStats {
            generation_index,
            best_fitness: best.map(|b| b.fit).unwrap_or(0.0),
            average_fitness: if n > 0 { sum / n as f64 } else { 0.0 },
            worst_fitness: self
                .individuals
                .iter()
                .map(|i| i.fit)
                .reduce(f64::min)
                .unwrap_or(0.0),
            feasible_count: self
                .individuals
                .iter()
                .filter(|i| i.is_feasible(capacity))
                .count(),
            best_weight: best
                .filter(|b| b.is_feasible(capacity))
                .map(|b| b.weight)
                .unwrap_or(0.0),
        }
    }
}

impl Default for Population {
    fn default() -> Self {
        Population::new()
    }
}
