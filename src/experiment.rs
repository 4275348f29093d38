use crate::data::{Catalog, Item};
use crate::individual::Individual;
use crate::param::Param;
use crate::population::Population;
use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fitness aggregates of one evaluated generation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    /// Index of the generation, starting at 0
    pub generation_index: usize,
    pub best_fitness: f64,
    pub average_fitness: f64,
    pub worst_fitness: f64,
    /// Number of individuals within capacity
    pub feasible_count: usize,
    /// Weight of the best feasible individual of the generation, 0 when nothing fits
    pub best_weight: f64,
}

/// Outcome of a complete solver run
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Experiment {
    pub id: String,
    pub version: String,
    pub timestamp: String,

    /// Resolved catalog the run was solved on
    pub items: Vec<Item>,
    pub capacity: f64,
    /// One entry per executed generation, in order
    pub stats: Vec<GenerationStats>,
    /// Best individual observed over the whole run
    pub best: Individual,
    /// Population left after the last generation
    pub final_population: Population,
    pub duration: Duration,

    pub parameters: Param,
}

impl Experiment {
    pub fn selected_items(&self) -> Vec<usize> {
        self.best.selected_items()
    }

    pub fn best_fitness(&self) -> f64 {
        self.best.fit
    }

    pub fn display(&self) -> String {
        let catalog = Catalog {
            items: self.items.clone(),
        };
        let colorful = self.parameters.general.display_colorful;
        let title = if colorful {
            "\x1b[1;93mBest packing\x1b[0m"
        } else {
            "Best packing"
        };
        format!(
            "{} over {} generations in {:.2?}\n{}",
            title,
            self.stats.len(),
            self.duration,
            self.best.display(&catalog, self.capacity, colorful)
        )
    }

    /// Saves the experiment in a format picked from the file extension.
    pub fn save_auto<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "json" => self.save_json(path),
            "yaml" | "yml" => self.save_yaml(path),
            "bin" | "bincode" => self.save_bincode(path),
            _ => {
                warn!("Unknown format. Saving experiment in json.");
                self.save_json(path.with_extension("json"))
            }
        }
    }

    fn save_json<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn save_yaml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Compact binary, Rust-only
    fn save_bincode<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let encoded = bincode::serialize(self)?;
        std::fs::write(path, encoded)?;
        Ok(())
    }

    /// Loads an experiment, detecting the format from the file extension.
    pub fn load_auto<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "json" => Self::load_json(path),
            "yaml" | "yml" => Self::load_yaml(path),
            "bin" | "bincode" => Self::load_bincode(path),
            _ => Self::load_with_fallback(path),
        }
    }

    fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn load_yaml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn load_bincode<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = std::fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }

    /// Tries bincode, then JSON, then YAML.
    fn load_with_fallback<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();

        if let Ok(experiment) = Self::load_bincode(path) {
            return Ok(experiment);
        }

        if let Ok(experiment) = Self::load_json(path) {
            return Ok(experiment);
        }

        if let Ok(experiment) = Self::load_yaml(path) {
            return Ok(experiment);
        }

        Err("Unable to load the experiment".into())
    }
}
