use crate::data::Catalog;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Candidate packing: one inclusion flag per catalog item
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Individual {
    /// `genes[i]` is true when item `i` is packed
    pub genes: Vec<bool>,
    /// Number of packed items
    pub k: usize,

    /// Fitness obtained on the catalog, 0 when over capacity
    pub fit: f64,
    /// Total weight of the packed items
    pub weight: f64,
    /// Total value of the packed items, regardless of feasibility
    pub value: f64,

    /// Generation in which the individual was born
    pub epoch: usize,
    /// Hashes of the parents in the generation context
    pub parents: Option<Vec<u64>>,

    /// Identifier hash of the gene
    pub hash: u64,
}

/// Scores a gene against the catalog: total value when the total weight fits, 0 otherwise.
///
/// The empty gene always scores 0 and is always feasible, so no infeasible gene can outscore it.
pub fn fitness(genes: &[bool], catalog: &Catalog, capacity: f64) -> f64 {
    let (weight, value) = catalog.totals(genes);
    if weight > capacity {
        0.0
    } else {
        value
    }
}

impl Individual {
    pub fn new() -> Individual {
        Individual {
            genes: Vec::new(),
            k: 0,
            fit: 0.0,
            weight: 0.0,
            value: 0.0,
            epoch: 0,
            parents: None,
            hash: 0,
        }
    }

    pub fn from_genes(genes: Vec<bool>) -> Individual {
        let mut i = Individual::new();
        i.genes = genes;
        i.count_k();
        i.compute_hash();
        i
    }

    /// Fills every position with a fair coin flip.
    pub fn random(item_count: usize, rng: &mut ChaCha8Rng) -> Individual {
        let genes = (0..item_count).map(|_| rng.gen_bool(0.5)).collect();
        Individual::from_genes(genes)
    }

    /// Empty offspring carrying the lineage of its parents.
    pub fn child(p1: &Individual, p2: &Individual, epoch: usize) -> Individual {
        let mut i = Individual::new();
        i.epoch = epoch;
        i.parents = Some(vec![p1.hash, p2.hash]);
        i
    }

    pub fn compute_hash(&mut self) {
        let mut hasher = DefaultHasher::new();
        self.genes.hash(&mut hasher);
        self.hash = hasher.finish();
    }

    pub fn count_k(&mut self) {
        self.k = self.genes.iter().filter(|g| **g).count();
    }

    /// Computes totals and fitness on the catalog and caches them on the individual.
    pub fn evaluate(&mut self, catalog: &Catalog, capacity: f64) -> f64 {
        let (weight, value) = catalog.totals(&self.genes);
        self.weight = weight;
        self.value = value;
        self.fit = if weight > capacity { 0.0 } else { value };
        self.fit
    }

    pub fn is_feasible(&self, capacity: f64) -> bool {
        self.weight <= capacity
    }

    /// True when `self` is strictly fitter than `other`, or as fit and within capacity
    /// while `other` is not.
    pub fn outranks(&self, other: &Individual, capacity: f64) -> bool {
        self.fit > other.fit
            || (self.fit == other.fit
                && self.is_feasible(capacity)
                && !other.is_feasible(capacity))
    }

    /// The empty packing, evaluated: fitness 0 and always feasible.
    pub fn empty(catalog: &Catalog, capacity: f64) -> Individual {
        let mut i = Individual::from_genes(vec![false; catalog.len()]);
        i.evaluate(catalog, capacity);
        i
    }

    /// Indices of the packed items, in catalog order
    pub fn selected_items(&self) -> Vec<usize> {
        self.genes
            .iter()
            .enumerate()
            .filter(|(_, g)| **g)
            .map(|(n, _)| n)
            .collect()
    }

    pub fn display(&self, catalog: &Catalog, capacity: f64, colorful: bool) -> String {
        let status = match (self.is_feasible(capacity), colorful) {
            (true, true) => "\x1b[1;92mfeasible\x1b[0m",
            (true, false) => "feasible",
            (false, true) => "\x1b[1;91mover capacity\x1b[0m",
            (false, false) => "over capacity",
        };
        let items = self
            .selected_items()
            .iter()
            .map(|n| {
                let item = &catalog.items[*n];
                format!("[{}] w={:.2} v={:.2}", n, item.weight, item.value)
            })
            .collect::<Vec<String>>()
            .join("\n  ");
        format!(
            "fit {:.3} | weight {:.3}/{:.3} ({}) | k {} | born at generation {}\n  {}",
            self.fit, self.weight, capacity, status, self.k, self.epoch, items
        )
    }
}

impl Default for Individual {
    fn default() -> Self {
        Individual::new()
    }
}

impl fmt::Debug for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: String = self.genes.iter().map(|g| if *g { '1' } else { '0' }).collect();
        write!(f, "{} fit={} k={}", bits, self.fit, self.k)
    }
}
