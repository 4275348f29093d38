use crate::cinfo;
use crate::data::Catalog;
use crate::errors::{KnapsackError, Result};
use crate::experiment::GenerationStats;
use crate::individual::Individual;
use crate::param::Param;
use crate::population::Population;
use crate::utils::{display_epoch, display_epoch_legend};
use log::{debug, info};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::time::Instant;

//-----------------------------------------------------------------------------
// Genetic Algorithm core functions
//-----------------------------------------------------------------------------

/// What the evolution loop hands back once every generation has run
#[derive(Clone, Debug)]
pub struct Evolution {
    /// One entry per executed generation
    pub stats: Vec<GenerationStats>,
    /// Best individual observed across all generations
    pub best: Individual,
    pub final_population: Population,
}

/// Main function to run the genetic algorithm
///
/// # Arguments
///
/// * `catalog` - The items to pack.
/// * `param` - Parameters for the genetic algorithm, already validated.
/// * `rng` - Random number generator driving every stochastic step of the run.
///
/// # Returns
///
/// The statistics of every generation, the best individual ever seen and the last population.
///
/// # Errors
///
/// `InvalidConfiguration` if an initial gene does not match the catalog length. The number
/// of initial genes is checked by `param::validate`.
pub fn ga(catalog: &Catalog, param: &Param, rng: &mut ChaCha8Rng) -> Result<Evolution> {
    let time = Instant::now();

    let base_pop = if let Some(genes) = &param.knapsack.initial_genes {
        let pop = Population::from_genes(genes, catalog.len())?;
        info!("Starting from {} provided initial genes.", pop.len());
        pop
    } else {
        generate_pop(catalog.len(), param, rng)
    };

    info!(
        "Population size: {}, items {}, capacity {}, tournament of {}, elitism {}",
        base_pop.len(),
        catalog.len(),
        param.knapsack.backpack_capacity,
        param.ga.tournament_sample_size,
        param.ga.elitism
    );

    cinfo!(
        param.general.display_colorful,
        "{}",
        display_epoch_legend(param)
    );
    let evolution = iterative_evolution(base_pop, catalog, param, rng)?;

    info!(
        "Genetic algorithm computed {} generations in {:.2?}",
        evolution.stats.len(),
        time.elapsed()
    );

    Ok(evolution)
}

/// Generate the initial population with a fair coin flip for every gene position
pub fn generate_pop(item_count: usize, param: &Param, rng: &mut ChaCha8Rng) -> Population {
    let mut pop = Population::new();
    debug!("generating...");
    pop.generate(param.ga.population_size, item_count, rng);
    pop
}

/// Run the generation loop on a base population
///
/// Each generation is evaluated, recorded, then replaced by a freshly built one. The
/// population that follows the last recorded generation is evaluated once more so the
/// returned best individual covers it too. When no individual of the whole run fits in the
/// knapsack, the empty packing is returned as best.
pub fn iterative_evolution(
    base_pop: Population,
    catalog: &Catalog,
    param: &Param,
    rng: &mut ChaCha8Rng,
) -> Result<Evolution> {
    let capacity = param.knapsack.backpack_capacity;
    let mut stats: Vec<GenerationStats> = Vec::with_capacity(param.ga.generation_count);

    let mut pop = base_pop;
    debug!("Fitting population...");
    pop.fit(catalog, capacity);

    let mut best = pop
        .best(capacity)
        .cloned()
        .ok_or_else(|| KnapsackError::invalid("population is empty"))?;

    for epoch in 0..param.ga.generation_count {
        let epoch_stats = pop.stats(epoch, capacity);
        if param.general.keep_trace {
            cinfo!(
                param.general.display_colorful,
                "{}",
                display_epoch(&epoch_stats, param)
            );
        } else {
            debug!("{}", display_epoch(&epoch_stats, param));
        }
        stats.push(epoch_stats);

        pop = evolve(&pop, catalog, param, epoch + 1, rng)?;

        if let Some(candidate) = pop.best(capacity) {
            if candidate.outranks(&best, capacity) {
                best = candidate.clone();
            }
        }
    }

    if !best.is_feasible(capacity) {
        debug!("No packing fits in the knapsack, falling back to the empty one");
        best = Individual::empty(catalog, capacity);
    }

    Ok(Evolution {
        stats,
        best,
        final_population: pop,
    })
}

/// Run one evolution step: selection, cross-over, mutation, fitting
///
/// Each child gets its own generator seeded from `rng`, so children may be bred in
/// parallel while the outcome stays identical for a given seed. The returned
/// population is fully evaluated and never shares storage with `pop`.
///
/// # Arguments
///
/// * `pop` - The current, evaluated population.
/// * `catalog` - The items to pack.
/// * `param` - Parameters for the genetic algorithm.
/// * `epoch` - Index of the generation being built.
/// * `rng` - Random number generator.
pub fn evolve(
    pop: &Population,
    catalog: &Catalog,
    param: &Param,
    epoch: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Population> {
    let capacity = param.knapsack.backpack_capacity;
    let size = param.ga.population_size;
    let mut new_pop = Population::new();

    let elite = if param.ga.elitism {
        pop.best(capacity).cloned()
    } else {
        None
    };

    // a lone individual has no room for a copy: its mutant competes with it instead
    let reserve_elite = size > 1 && elite.is_some();
    if reserve_elite {
        if let Some(e) = &elite {
            new_pop.individuals.push(e.clone());
        }
    }

    let children_to_create = size - new_pop.len();
    let seeds: Vec<u64> = (0..children_to_create).map(|_| rng.next_u64()).collect();

    let children: Result<Vec<Individual>> = seeds
        .into_par_iter()
        .map(|seed| {
            let mut child_rng = ChaCha8Rng::seed_from_u64(seed);
            let p1 = tournament_select(pop, param.ga.tournament_sample_size, &mut child_rng)?;
            let p2 = tournament_select(pop, param.ga.tournament_sample_size, &mut child_rng)?;
            let mut child = cross_over(p1, p2, epoch, &mut child_rng);
            mutate(&mut child, param.ga.mutation_rate, &mut child_rng)?;
            Ok(child)
        })
        .collect();

    let mut children = Population {
        individuals: children?,
    };

    debug!("Fitting children...");
    children.fit(catalog, capacity);

    if !reserve_elite {
        if let (Some(e), Some(child)) = (elite, children.individuals.first_mut()) {
            if e.outranks(child, capacity) {
                *child = e;
            }
        }
    }

    new_pop.add(children);

    Ok(new_pop)
}

/// Tournament selection
///
/// Draws `sample_size` individuals uniformly, with replacement, and returns the
/// fittest of them. The first drawn wins ties.
///
/// # Errors
///
/// `InvalidConfiguration` if `sample_size` is 0 or the population is empty.
pub fn tournament_select<'a>(
    pop: &'a Population,
    sample_size: usize,
    rng: &mut ChaCha8Rng,
) -> Result<&'a Individual> {
    if sample_size < 1 {
        return Err(KnapsackError::invalid("tournament sample size must be >= 1"));
    }
    if pop.is_empty() {
        return Err(KnapsackError::invalid("cannot select from an empty population"));
    }

    let len = pop.individuals.len();
    let mut winner = &pop.individuals[rng.gen_range(0..len)];
    for _ in 1..sample_size {
        let contender = &pop.individuals[rng.gen_range(0..len)];
        if contender.fit > winner.fit {
            winner = contender;
        }
    }
    Ok(winner)
}

/// Single-point crossover
///
/// The child takes `p1` genes before a random cut in `[1, len - 1]` and `p2` genes from the
/// cut onward. With a single gene there is no cut and the child copies `p1`.
pub fn cross_over(
    p1: &Individual,
    p2: &Individual,
    epoch: usize,
    rng: &mut ChaCha8Rng,
) -> Individual {
    debug_assert_eq!(p1.genes.len(), p2.genes.len());
    let len = p1.genes.len();
    let mut child = Individual::child(p1, p2, epoch);

    child.genes = if len < 2 {
        p1.genes.clone()
    } else {
        let cut = rng.gen_range(1..len);
        p1.genes[..cut]
            .iter()
            .chain(p2.genes[cut..].iter())
            .copied()
            .collect()
    };

    child.count_k();
    child.compute_hash();
    child
}

/// Flips each gene independently with probability `mutation_rate`
///
/// # Errors
///
/// `InvalidConfiguration` if `mutation_rate` is outside `[0, 1]`.
pub fn mutate(
    individual: &mut Individual,
    mutation_rate: f64,
    rng: &mut ChaCha8Rng,
) -> Result<()> {
    if !(0.0..=1.0).contains(&mutation_rate) {
        return Err(KnapsackError::invalid(format!(
            "Invalid mutation_rate={}. Must be in range [0, 1].",
            mutation_rate
        )));
    }

    for gene in individual.genes.iter_mut() {
        if rng.gen_bool(mutation_rate) {
            *gene = !*gene;
        }
    }

    individual.count_k();
    individual.compute_hash();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Item;

    /// Helper function to create the four item catalog whose optimum at capacity 7 is 9
    fn create_test_catalog() -> Catalog {
        Catalog::new_from_items(
            vec![
                Item { weight: 1.0, value: 1.0 },
                Item { weight: 3.0, value: 4.0 },
                Item { weight: 4.0, value: 5.0 },
                Item { weight: 5.0, value: 7.0 },
            ],
            4,
        )
        .unwrap()
    }

    /// Helper function to create default parameters for testing
    fn create_test_params() -> Param {
        let mut param = Param::default();
        param.general.display_colorful = false;
        param.ga.generation_count = 20;
        param.ga.population_size = 20;
        param.ga.mutation_rate = 0.05;
        param.ga.tournament_sample_size = 3;
        param.ga.elitism = true;
        param.knapsack.item_count = 4;
        param.knapsack.backpack_capacity = 7.0;
        param
    }

    fn evaluated(genes: &[Vec<bool>], catalog: &Catalog, capacity: f64) -> Population {
        let mut pop = Population::from_genes(genes, catalog.len()).unwrap();
        pop.fit(catalog, capacity);
        pop
    }

    #[test]
    fn test_tournament_returns_fittest_of_whole_population_with_large_sample() {
        let catalog = create_test_catalog();
        let pop = evaluated(
            &[
                vec![true, false, false, false],
                vec![false, true, true, false],
                vec![false, false, false, true],
            ],
            &catalog,
            7.0,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        // 200 draws over 3 individuals sample every one of them
        let winner = tournament_select(&pop, 200, &mut rng).unwrap();
        assert_eq!(winner.fit, 9.0);
    }

    #[test]
    fn test_tournament_rejects_zero_sample_size() {
        let catalog = create_test_catalog();
        let pop = evaluated(&[vec![true, false, false, false]], &catalog, 7.0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let err = tournament_select(&pop, 0, &mut rng).unwrap_err();
        assert!(err.is_invalid_configuration());
        assert!(tournament_select(&Population::new(), 1, &mut rng).is_err());
    }

    #[test]
    fn test_tournament_on_single_individual_returns_it() {
        let catalog = create_test_catalog();
        let pop = evaluated(&[vec![true, false, true, false]], &catalog, 7.0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let winner = tournament_select(&pop, 5, &mut rng).unwrap();
        assert_eq!(winner.genes, vec![true, false, true, false]);
    }

    #[test]
    fn test_tournament_pressure_favours_fitter_individuals() {
        let catalog = create_test_catalog();
        let mut genes = vec![vec![false; 4]; 9];
        genes.push(vec![false, true, true, false]);
        let pop = evaluated(&genes, &catalog, 7.0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let wins_small = (0..1000)
            .filter(|_| tournament_select(&pop, 1, &mut rng).unwrap().fit == 9.0)
            .count();
        let wins_large = (0..1000)
            .filter(|_| tournament_select(&pop, 5, &mut rng).unwrap().fit == 9.0)
            .count();
        assert!(wins_large > wins_small);
    }

    #[test]
    fn test_cross_over_takes_prefix_and_suffix() {
        let p1 = Individual::from_genes(vec![true; 10]);
        let p2 = Individual::from_genes(vec![false; 10]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..100 {
            let child = cross_over(&p1, &p2, 1, &mut rng);
            assert_eq!(child.genes.len(), 10);
            let cut = child.genes.iter().position(|g| !*g).unwrap();
            assert!(cut >= 1 && cut <= 9, "cut {} out of [1, 9]", cut);
            assert!(child.genes[..cut].iter().all(|g| *g));
            assert!(child.genes[cut..].iter().all(|g| !*g));
            assert_eq!(child.k, cut);
            assert_eq!(child.parents, Some(vec![p1.hash, p2.hash]));
        }
    }

    #[test]
    fn test_cross_over_single_gene_copies_first_parent() {
        let p1 = Individual::from_genes(vec![true]);
        let p2 = Individual::from_genes(vec![false]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(cross_over(&p1, &p2, 1, &mut rng).genes, vec![true]);
    }

    #[test]
    fn test_cross_over_with_itself_is_identity() {
        let p = Individual::from_genes(vec![true, false, true, true, false]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let child = cross_over(&p, &p, 1, &mut rng);
        assert_eq!(child.genes, p.genes);
        assert_eq!(child.hash, p.hash);
    }

    #[test]
    fn test_mutate_extreme_rates() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut i = Individual::from_genes(vec![true, false, true, false]);

        mutate(&mut i, 0.0, &mut rng).unwrap();
        assert_eq!(i.genes, vec![true, false, true, false]);

        mutate(&mut i, 1.0, &mut rng).unwrap();
        assert_eq!(i.genes, vec![false, true, false, true]);
        assert_eq!(i.k, 2);
    }

    #[test]
    fn test_mutate_rate_is_respected_on_average() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut i = Individual::from_genes(vec![false; 10_000]);
        mutate(&mut i, 0.1, &mut rng).unwrap();
        assert!(i.k > 800 && i.k < 1200, "flipped {}", i.k);
    }

    #[test]
    fn test_mutate_rejects_invalid_rate() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut i = Individual::from_genes(vec![false; 3]);
        assert!(mutate(&mut i, 1.01, &mut rng).unwrap_err().is_invalid_configuration());
        assert!(mutate(&mut i, -0.5, &mut rng).is_err());
        assert_eq!(i.genes, vec![false; 3]);
    }

    #[test]
    fn test_evolve_preserves_size_and_gene_length() {
        let catalog = create_test_catalog();
        let param = create_test_params();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pop = generate_pop(catalog.len(), &param, &mut rng);
        pop.fit(&catalog, 7.0);

        for epoch in 1..=10 {
            pop = evolve(&pop, &catalog, &param, epoch, &mut rng).unwrap();
            assert_eq!(pop.len(), param.ga.population_size);
            assert!(pop.individuals.iter().all(|i| i.genes.len() == 4));
        }
    }

    #[test]
    fn test_evolve_keeps_elite_unmutated() {
        let catalog = create_test_catalog();
        let mut param = create_test_params();
        param.ga.mutation_rate = 1.0;
        param.ga.population_size = 4;
        let pop = evaluated(
            &[
                vec![false, true, true, false],
                vec![false; 4],
                vec![true, false, false, false],
                vec![false; 4],
            ],
            &catalog,
            7.0,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let next = evolve(&pop, &catalog, &param, 1, &mut rng).unwrap();
        assert_eq!(next.individuals[0].genes, vec![false, true, true, false]);
        assert_eq!(next.individuals[0].fit, 9.0);
        assert_eq!(next.len(), 4);
    }

    #[test]
    fn test_evolve_single_individual_still_mutates() {
        let catalog = create_test_catalog();
        let mut param = create_test_params();
        param.ga.population_size = 1;
        param.ga.mutation_rate = 1.0;
        param.ga.elitism = false;
        let pop = evaluated(&[vec![true, false, false, false]], &catalog, 7.0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let next = evolve(&pop, &catalog, &param, 1, &mut rng).unwrap();
        assert_eq!(next.individuals[0].genes, vec![false, true, true, true]);
    }

    #[test]
    fn test_evolve_single_individual_with_elitism_never_regresses() {
        let catalog = create_test_catalog();
        let mut param = create_test_params();
        param.ga.population_size = 1;
        param.ga.mutation_rate = 1.0;
        // the full flip of [0,1,1,0] is [1,0,0,1]: fit 8 < 9, so the parent stays
        let pop = evaluated(&[vec![false, true, true, false]], &catalog, 7.0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let next = evolve(&pop, &catalog, &param, 1, &mut rng).unwrap();
        assert_eq!(next.individuals[0].genes, vec![false, true, true, false]);
    }

    #[test]
    fn test_evolve_does_not_touch_current_population() {
        let catalog = create_test_catalog();
        let mut param = create_test_params();
        param.ga.mutation_rate = 1.0;
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pop = generate_pop(catalog.len(), &param, &mut rng);
        pop.fit(&catalog, 7.0);
        let before = pop.clone();

        let _ = evolve(&pop, &catalog, &param, 1, &mut rng).unwrap();
        assert_eq!(pop, before);
    }

    #[test]
    fn test_best_fitness_non_decreasing_with_elitism() {
        let catalog = create_test_catalog();
        let mut param = create_test_params();
        param.ga.generation_count = 50;
        param.ga.mutation_rate = 0.3;
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let evolution = ga(&catalog, &param, &mut rng).unwrap();
        assert_eq!(evolution.stats.len(), 50);
        for w in evolution.stats.windows(2) {
            assert!(w[1].best_fitness >= w[0].best_fitness);
        }
        for (n, s) in evolution.stats.iter().enumerate() {
            assert_eq!(s.generation_index, n);
        }
    }

    #[test]
    fn test_best_is_tracked_across_generations_without_elitism() {
        let catalog = create_test_catalog();
        let mut param = create_test_params();
        param.ga.elitism = false;
        param.ga.mutation_rate = 0.5;
        param.ga.generation_count = 30;
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let evolution = ga(&catalog, &param, &mut rng).unwrap();
        let max_recorded = evolution
            .stats
            .iter()
            .map(|s| s.best_fitness)
            .fold(0.0, f64::max);
        assert!(evolution.best.fit >= max_recorded);
    }

    #[test]
    fn test_no_new_pattern_without_mutation() {
        let catalog = create_test_catalog();
        let mut param = create_test_params();
        param.ga.mutation_rate = 0.0;
        param.ga.population_size = 6;
        // item 3 is never packed in generation 0
        let mut pop = evaluated(
            &[
                vec![true, false, false, false],
                vec![false, true, false, false],
                vec![false, false, true, false],
                vec![true, true, false, false],
                vec![false, true, true, false],
                vec![true, false, true, false],
            ],
            &catalog,
            7.0,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for epoch in 1..=50 {
            pop = evolve(&pop, &catalog, &param, epoch, &mut rng).unwrap();
            assert!(pop.individuals.iter().all(|i| !i.genes[3]));
        }
    }

    #[test]
    fn test_ga_rejects_initial_gene_of_wrong_length() {
        let catalog = create_test_catalog();
        let mut param = create_test_params();
        param.ga.population_size = 1;
        param.knapsack.initial_genes = Some(vec![vec![false; 3]]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(ga(&catalog, &param, &mut rng).unwrap_err().is_invalid_configuration());
    }

    #[test]
    fn test_best_is_feasible_when_no_item_fits() {
        let catalog = create_test_catalog();
        let mut param = create_test_params();
        // lighter than every item: only the empty packing fits
        param.knapsack.backpack_capacity = 0.5;
        param.ga.mutation_rate = 0.3;
        param.ga.generation_count = 10;
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let evolution = ga(&catalog, &param, &mut rng).unwrap();
        assert!(evolution.best.weight <= 0.5);
        assert_eq!(evolution.best.fit, 0.0);
        assert!(evolution.best.is_feasible(0.5));
        for s in &evolution.stats {
            assert!(s.best_weight <= 0.5);
        }
    }

    #[test]
    fn test_best_is_feasible_when_ties_mix_feasible_and_over_capacity() {
        let catalog = create_test_catalog();
        let mut param = create_test_params();
        param.knapsack.backpack_capacity = 0.5;
        param.ga.population_size = 3;
        param.ga.generation_count = 0;
        param.knapsack.initial_genes = Some(vec![
            vec![true, true, true, true],
            vec![false; 4],
            vec![false, true, false, false],
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let evolution = ga(&catalog, &param, &mut rng).unwrap();
        assert_eq!(evolution.best.genes, vec![false; 4]);
    }

    #[test]
    fn test_zero_generations_returns_initial_best() {
        let catalog = create_test_catalog();
        let mut param = create_test_params();
        param.ga.generation_count = 0;
        param.ga.population_size = 2;
        param.knapsack.initial_genes = Some(vec![
            vec![true, false, false, false],
            vec![false, false, false, true],
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let evolution = ga(&catalog, &param, &mut rng).unwrap();
        assert!(evolution.stats.is_empty());
        assert_eq!(evolution.best.genes, vec![false, false, false, true]);
        assert_eq!(evolution.best.fit, 7.0);
    }

    #[test]
    fn test_same_seed_same_run() {
        let catalog = create_test_catalog();
        let param = create_test_params();

        let a = ga(&catalog, &param, &mut ChaCha8Rng::seed_from_u64(99)).unwrap();
        let b = ga(&catalog, &param, &mut ChaCha8Rng::seed_from_u64(99)).unwrap();
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.best, b.best);
        assert_eq!(a.final_population, b.final_population);
    }
}
