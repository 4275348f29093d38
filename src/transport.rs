//! Message-passing front of the solver.
//!
//! A [`Worker`] owns a background thread and two channels. Every text posted on the
//! inbound channel is read as a JSON [`SolveRequest`], solved, and answered by exactly
//! one JSON [`Reply`] on the outbound channel. Nothing is validated or retried here:
//! malformed payloads come back as `InvalidConfiguration` replies.

use crate::data::Item;
use crate::errors::{KnapsackError, Result};
use crate::experiment::{Experiment, GenerationStats};
use crate::param::Param;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Flat, camelCase run configuration as carried by the inbound payload
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub generation_count: usize,
    pub population_size: usize,
    pub mutation_rate: f64,
    pub item_count: usize,
    pub backpack_capacity: f64,
    pub tournament_sample_size: usize,
    #[serde(default)]
    pub initial_genes: Option<Vec<Vec<bool>>>,
    #[serde(default)]
    pub weight_range: Option<[f64; 2]>,
    #[serde(default)]
    pub value_range: Option<[f64; 2]>,
    #[serde(default)]
    pub items: Option<Vec<Item>>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub elitism: Option<bool>,
}

impl SolveRequest {
    /// Maps the payload onto `Param`, unset optional fields keeping their defaults.
    pub fn into_param(self) -> Param {
        let mut param = Param::default();
        param.general.display_colorful = false;
        param.general.keep_trace = false;
        if let Some(seed) = self.seed {
            param.general.seed = seed;
        }

        param.ga.generation_count = self.generation_count;
        param.ga.population_size = self.population_size;
        param.ga.mutation_rate = self.mutation_rate;
        param.ga.tournament_sample_size = self.tournament_sample_size;
        if let Some(elitism) = self.elitism {
            param.ga.elitism = elitism;
        }

        param.knapsack.item_count = self.item_count;
        param.knapsack.backpack_capacity = self.backpack_capacity;
        if let Some(range) = self.weight_range {
            param.knapsack.weight_range = range;
        }
        if let Some(range) = self.value_range {
            param.knapsack.value_range = range;
        }
        param.knapsack.items = self.items;
        param.knapsack.initial_genes = self.initial_genes;
        param
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BestPacking {
    pub genes: Vec<bool>,
    pub selected_items: Vec<usize>,
    pub fitness: f64,
    pub weight: f64,
}

/// Outbound payload of a successful run
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SolveResponse {
    pub items: Vec<Item>,
    pub stats: Vec<GenerationStats>,
    /// Elapsed wall-clock time in milliseconds
    pub duration: f64,
    pub best: BestPacking,
}

impl From<Experiment> for SolveResponse {
    fn from(exp: Experiment) -> Self {
        SolveResponse {
            best: BestPacking {
                selected_items: exp.best.selected_items(),
                fitness: exp.best.fit,
                weight: exp.best.weight,
                genes: exp.best.genes,
            },
            items: exp.items,
            stats: exp.stats,
            duration: exp.duration.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Reply {
    Solved(SolveResponse),
    Failed { error: String },
}

/// Solves a typed request in-process.
pub fn solve_request(request: SolveRequest) -> Result<SolveResponse> {
    let param = request.into_param();
    let mut rng = ChaCha8Rng::seed_from_u64(param.general.seed);
    let experiment = crate::solve(&param, &mut rng)?;
    Ok(experiment.into())
}

/// One full round trip: JSON request text in, JSON reply text out.
pub fn handle_message(payload: &str) -> String {
    let reply = match serde_json::from_str::<SolveRequest>(payload)
        .map_err(KnapsackError::from)
        .and_then(solve_request)
    {
        Ok(response) => Reply::Solved(response),
        Err(e) => {
            warn!("Request rejected: {}", e);
            Reply::Failed {
                error: e.to_string(),
            }
        }
    };
    serde_json::to_string(&reply).unwrap_or_else(|e| {
        serde_json::json!({ "error": format!("unable to encode reply: {}", e) }).to_string()
    })
}

/// Background solver reached through an inbound and an outbound channel
pub struct Worker {
    inbound: Option<Sender<String>>,
    outbound: Receiver<String>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn() -> Result<Worker> {
        let (in_tx, in_rx) = mpsc::channel::<String>();
        let (out_tx, out_rx) = mpsc::channel::<String>();

        let handle = thread::Builder::new()
            .name("gknapsack-worker".to_string())
            .spawn(move || {
                for message in in_rx {
                    debug!("Worker received {} bytes", message.len());
                    if out_tx.send(handle_message(&message)).is_err() {
                        break;
                    }
                }
                debug!("Worker inbound channel closed");
            })?;

        info!("Knapsack worker started");
        Ok(Worker {
            inbound: Some(in_tx),
            outbound: out_rx,
            handle: Some(handle),
        })
    }

    pub fn post_message<S: Into<String>>(&self, payload: S) -> Result<()> {
        let sender = self.inbound.as_ref().ok_or_else(worker_gone)?;
        sender.send(payload.into()).map_err(|_| worker_gone())
    }

    /// Blocks until the next reply. `None` once the worker has stopped.
    pub fn recv(&self) -> Option<String> {
        self.outbound.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<String> {
        match self.outbound.recv_timeout(timeout) {
            Ok(reply) => Some(reply),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // closing the inbound channel ends the worker loop
        self.inbound.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Knapsack worker thread panicked");
            }
        }
    }
}

fn worker_gone() -> KnapsackError {
    KnapsackError::Io(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "knapsack worker is not running",
    ))
}
