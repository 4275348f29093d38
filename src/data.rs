use crate::errors::{KnapsackError, Result};
use crate::param::{validate_range, Param};
use log::debug;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An object that may be packed, addressed by its position in the catalog
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub weight: f64,
    pub value: f64,
}

/// Fixed list of items shared read-only by every individual of a run
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub items: Vec<Item>,
}

impl Catalog {
    /// Wraps an explicit item list, checking it holds exactly `item_count` usable items.
    pub fn new_from_items(items: Vec<Item>, item_count: usize) -> Result<Catalog> {
        if item_count < 1 {
            return Err(KnapsackError::invalid("item_count must be >= 1"));
        }
        if items.len() != item_count {
            return Err(KnapsackError::invalid(format!(
                "{} explicit items provided but item_count={}.",
                items.len(),
                item_count
            )));
        }
        if let Some(n) = items.iter().position(|i| {
            !i.weight.is_finite() || !i.value.is_finite() || i.weight < 0.0 || i.value < 0.0
        }) {
            return Err(KnapsackError::invalid(format!(
                "Item #{} must have a non-negative weight and value.",
                n
            )));
        }
        Ok(Catalog { items })
    }

    /// Draws `item_count` items, weight then value for each, uniformly within the inclusive ranges.
    pub fn generate(
        item_count: usize,
        weight_range: [f64; 2],
        value_range: [f64; 2],
        rng: &mut ChaCha8Rng,
    ) -> Result<Catalog> {
        if item_count < 1 {
            return Err(KnapsackError::invalid("item_count must be >= 1"));
        }
        validate_range("weight_range", &weight_range)?;
        validate_range("value_range", &value_range)?;

        let items = (0..item_count)
            .map(|_| {
                let weight = rng.gen_range(weight_range[0]..=weight_range[1]);
                let value = rng.gen_range(value_range[0]..=value_range[1]);
                Item { weight, value }
            })
            .collect();

        Ok(Catalog { items })
    }

    pub fn new_from_param(param: &Param, rng: &mut ChaCha8Rng) -> Result<Catalog> {
        let knapsack = &param.knapsack;
        match &knapsack.items {
            Some(items) => {
                debug!("Using {} explicit items", items.len());
                Catalog::new_from_items(items.clone(), knapsack.item_count)
            }
            None => {
                debug!(
                    "Generating {} items (weights {:?}, values {:?})",
                    knapsack.item_count, knapsack.weight_range, knapsack.value_range
                );
                Catalog::generate(
                    knapsack.item_count,
                    knapsack.weight_range,
                    knapsack.value_range,
                    rng,
                )
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns (total weight, total value) of the items flagged in `genes`.
    pub fn totals(&self, genes: &[bool]) -> (f64, f64) {
        genes
            .iter()
            .zip(self.items.iter())
            .filter(|(included, _)| **included)
            .fold((0.0, 0.0), |(w, v), (_, item)| {
                (w + item.weight, v + item.value)
            })
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let total_weight: f64 = self.items.iter().map(|i| i.weight).sum();
        let total_value: f64 = self.items.iter().map(|i| i.value).sum();
        writeln!(
            f,
            "Catalog: {} items, total weight {:.2}, total value {:.2}",
            self.items.len(),
            total_weight,
            total_value
        )?;
        for (n, item) in self.items.iter().take(20).enumerate() {
            writeln!(f, "  #{:<4} weight {:>10.3}  value {:>10.3}", n, item.weight, item.value)?;
        }
        if self.items.len() > 20 {
            writeln!(f, "  ... ({} more)", self.items.len() - 20)?;
        }
        Ok(())
    }
}
