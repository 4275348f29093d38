pub mod data;
pub mod errors;
pub mod experiment;
pub mod ga;
pub mod individual;
pub mod param;
pub mod population;
pub mod transport;
pub mod utils;

use chrono::Local;
use data::Catalog;
use errors::{KnapsackError, Result};
use experiment::Experiment;
use ga::ga;
use log::debug;
use param::Param;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::ThreadPoolBuilder;

/// Crate version with the git revision it was built from, when known
pub fn version() -> String {
    format!(
        "{}#{}",
        env!("CARGO_PKG_VERSION"),
        option_env!("GKNAPSACK_GIT_SHA").unwrap_or("unknown")
    )
}

/// Solves the knapsack described by `param` with the random stream `rng`.
///
/// The configuration is validated first: an `InvalidConfiguration` error means no
/// generation was executed. For a given configuration and stream, the statistics and
/// the best individual are always the same.
pub fn solve(param: &Param, rng: &mut ChaCha8Rng) -> Result<Experiment> {
    let start = std::time::Instant::now();
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();

    let mut param = param.clone();
    param::validate(&mut param)?;

    let catalog = Catalog::new_from_param(&param, rng)?;
    debug!("{:?}", catalog);

    let evolution = ga(&catalog, &param, rng)?;

    let stem = param
        .general
        .save_exp
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("knapsack")
        .to_string();

    Ok(Experiment {
        id: format!("{}_{}", stem, timestamp),
        version: version(),
        timestamp,
        items: catalog.items,
        capacity: param.knapsack.backpack_capacity,
        stats: evolution.stats,
        best: evolution.best,
        final_population: evolution.final_population,
        duration: start.elapsed(),
        parameters: param,
    })
}

/// Runs a complete experiment seeded from `param.general.seed` on a dedicated thread pool.
pub fn run(param: &Param) -> Result<Experiment> {
    let mut rng = ChaCha8Rng::seed_from_u64(param.general.seed);

    let pool = ThreadPoolBuilder::new()
        .num_threads(param.general.thread_number.max(1))
        .build()
        .map_err(|e| KnapsackError::invalid(format!("cannot build thread pool: {}", e)))?;

    pool.install(|| solve(param, &mut rng))
}
