use crate::data::Item;
use crate::errors::{KnapsackError, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;

// Field definitions and associated default values

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Param {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub ga: GA,
    #[serde(default)]
    pub knapsack: Knapsack,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct General {
    #[serde(default = "seed_default")]
    pub seed: u64,
    #[serde(default = "one_default")]
    pub thread_number: usize,
    #[serde(default = "log_base_default")]
    pub log_base: String,
    #[serde(default = "log_suffix_default")]
    pub log_suffix: String,
    #[serde(default = "log_level_default")]
    pub log_level: String,
    #[serde(default = "true_default")]
    pub display_colorful: bool,
    #[serde(default = "true_default")]
    pub keep_trace: bool,
    #[serde(default = "empty_string")]
    pub save_exp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GA {
    #[serde(default = "generation_count_default")]
    pub generation_count: usize,
    #[serde(default = "pop_size_default")]
    pub population_size: usize,
    #[serde(default = "mutation_rate_default")]
    pub mutation_rate: f64,
    #[serde(default = "tournament_sample_size_default")]
    pub tournament_sample_size: usize,
    #[serde(default = "true_default")]
    pub elitism: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Knapsack {
    #[serde(default = "item_count_default")]
    pub item_count: usize,
    #[serde(default = "backpack_capacity_default")]
    pub backpack_capacity: f64,
    #[serde(default = "range_default")]
    pub weight_range: [f64; 2],
    #[serde(default = "range_default")]
    pub value_range: [f64; 2],
    /// Explicit catalog, overrides random generation when present
    #[serde(default)]
    pub items: Option<Vec<Item>>,
    /// Seeds generation 0 when present
    #[serde(default)]
    pub initial_genes: Option<Vec<Vec<bool>>>,
}

// Default section definitions

impl Default for General {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for GA {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Knapsack {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Param {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

/// Loads and validates a YAML parameter file.
pub fn get(param_file: String) -> Result<Param> {
    let param_file_reader = File::open(param_file)?;
    let param_reader = BufReader::new(param_file_reader);

    let mut config: Param = serde_yaml::from_reader(param_reader)?;

    validate(&mut config)?;

    Ok(config)
}

/// Checks every precondition of a run. Nothing is executed when this fails.
pub fn validate(param: &mut Param) -> Result<()> {
    if param.general.log_base.len() > 0 {
        param.general.display_colorful = false;
    }

    if param.general.thread_number == 0 {
        return Err(KnapsackError::invalid("thread_number must be >= 1"));
    }

    validate_ga(param)?;
    validate_knapsack(param)?;

    Ok(())
}

fn validate_ga(param: &Param) -> Result<()> {
    if param.ga.population_size < 1 {
        return Err(KnapsackError::invalid(format!(
            "Invalid population_size={}. Must be >= 1.",
            param.ga.population_size
        )));
    }

    if !(0.0..=1.0).contains(&param.ga.mutation_rate) {
        return Err(KnapsackError::invalid(format!(
            "Invalid mutation_rate={}. Must be in range [0, 1].",
            param.ga.mutation_rate
        )));
    }

    if param.ga.tournament_sample_size < 1 {
        return Err(KnapsackError::invalid(format!(
            "Invalid tournament_sample_size={}. Must be >= 1.",
            param.ga.tournament_sample_size
        )));
    }

    if param.ga.tournament_sample_size > param.ga.population_size {
        warn!(
            "tournament_sample_size={} exceeds population_size={}: individuals will be drawn several times per tournament.",
            param.ga.tournament_sample_size, param.ga.population_size
        );
    }

    if param.ga.population_size == 1 && param.ga.generation_count > 0 {
        warn!("population_size=1: selection and crossover are pass-through, only mutation will explore.");
    }

    Ok(())
}

fn validate_knapsack(param: &Param) -> Result<()> {
    let knapsack = &param.knapsack;

    if knapsack.item_count < 1 {
        return Err(KnapsackError::invalid(format!(
            "Invalid item_count={}. Must be >= 1.",
            knapsack.item_count
        )));
    }

    if !knapsack.backpack_capacity.is_finite() || knapsack.backpack_capacity < 0.0 {
        return Err(KnapsackError::invalid(format!(
            "Invalid backpack_capacity={}. Must be a non-negative number.",
            knapsack.backpack_capacity
        )));
    }

    match &knapsack.items {
        Some(items) => {
            if items.len() != knapsack.item_count {
                return Err(KnapsackError::invalid(format!(
                    "{} explicit items provided but item_count={}.",
                    items.len(),
                    knapsack.item_count
                )));
            }
            if let Some(lightest) = items.iter().map(|i| i.weight).reduce(f64::min) {
                if lightest > knapsack.backpack_capacity {
                    warn!(
                        "backpack_capacity={} is below the lightest item ({}): only the empty selection is feasible.",
                        knapsack.backpack_capacity, lightest
                    );
                }
            }
        }
        None => {
            validate_range("weight_range", &knapsack.weight_range)?;
            validate_range("value_range", &knapsack.value_range)?;
        }
    }

    if let Some(genes) = &knapsack.initial_genes {
        if genes.len() != param.ga.population_size {
            return Err(KnapsackError::invalid(format!(
                "{} initial genes provided but population_size={}.",
                genes.len(),
                param.ga.population_size
            )));
        }
        if let Some((n, gene)) = genes
            .iter()
            .enumerate()
            .find(|(_, g)| g.len() != knapsack.item_count)
        {
            return Err(KnapsackError::invalid(format!(
                "Initial gene #{} has {} positions but item_count={}.",
                n,
                gene.len(),
                knapsack.item_count
            )));
        }
    }

    Ok(())
}

pub(crate) fn validate_range(name: &str, range: &[f64; 2]) -> Result<()> {
    let [min, max] = *range;
    if !min.is_finite() || !max.is_finite() || min < 0.0 {
        return Err(KnapsackError::invalid(format!(
            "Invalid {}=[{}, {}]. Bounds must be non-negative numbers.",
            name, min, max
        )));
    }
    if min > max {
        return Err(KnapsackError::invalid(format!(
            "Invalid {}=[{}, {}]. Lower bound exceeds upper bound.",
            name, min, max
        )));
    }
    Ok(())
}

// Default value definitions

fn seed_default() -> u64 {
    4815162342
}
fn empty_string() -> String {
    "".to_string()
}
fn log_base_default() -> String {
    "".to_string()
}
fn log_suffix_default() -> String {
    "log".to_string()
}
fn log_level_default() -> String {
    "info".to_string()
}
fn true_default() -> bool {
    true
}
fn one_default() -> usize {
    1
}
fn generation_count_default() -> usize {
    100
}
fn pop_size_default() -> usize {
    50
}
fn mutation_rate_default() -> f64 {
    0.01
}
fn tournament_sample_size_default() -> usize {
    3
}
fn item_count_default() -> usize {
    20
}
fn backpack_capacity_default() -> f64 {
    50.0
}
fn range_default() -> [f64; 2] {
    [1.0, 10.0]
}
