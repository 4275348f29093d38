use crate::experiment::GenerationStats;
use crate::param::Param;

/// Logs at info level, keeping ANSI colors only when the first argument is true
#[macro_export]
macro_rules! cinfo {
    ($colorful:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        if $colorful {
            log::info!("{}", message);
        } else {
            log::info!("{}", $crate::utils::strip_ansi(&message));
        }
    }};
}

/// Removes ANSI escape sequences (`ESC [ ... letter`) from a string
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

pub fn display_epoch_legend(param: &Param) -> String {
    if param.general.display_colorful {
        "Legend:    [generation] \x1b[1;92mbest\x1b[0m | \x1b[1;93maverage\x1b[0m | worst | feasible/population | best weight/capacity".to_string()
    } else {
        "Legend:    [generation] best | average | worst | feasible/population | best weight/capacity".to_string()
    }
}

pub fn display_epoch(stats: &GenerationStats, param: &Param) -> String {
    if param.general.display_colorful {
        format!(
            "#{:<6} \x1b[1;92m{:>12.3}\x1b[0m | \x1b[1;93m{:>12.3}\x1b[0m | {:>12.3} | {:>6}/{:<6} | {:.3}/{:.3}",
            stats.generation_index,
            stats.best_fitness,
            stats.average_fitness,
            stats.worst_fitness,
            stats.feasible_count,
            param.ga.population_size,
            stats.best_weight,
            param.knapsack.backpack_capacity
        )
    } else {
        format!(
            "#{:<6} {:>12.3} | {:>12.3} | {:>12.3} | {:>6}/{:<6} | {:.3}/{:.3}",
            stats.generation_index,
            stats.best_fitness,
            stats.average_fitness,
            stats.worst_fitness,
            stats.feasible_count,
            param.ga.population_size,
            stats.best_weight,
            param.knapsack.backpack_capacity
        )
    }
}
