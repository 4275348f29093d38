use flexi_logger::{FileSpec, Logger, WriteMode};
use gknapsack::cinfo;
use gknapsack::param;
use gknapsack::run;
use log::{error, info};
use std::process::ExitCode;

fn main() -> ExitCode {
    let param_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "param.yaml".to_string());

    let param = match param::get(param_path.clone()) {
        Ok(param) => param,
        Err(e) => {
            eprintln!("Unable to load {}: {}", param_path, e);
            return ExitCode::FAILURE;
        }
    };

    let logger = Logger::try_with_env_or_str(&param.general.log_level);
    let logger = match logger {
        Ok(logger) if !param.general.log_base.is_empty() => logger
            .log_to_file(
                FileSpec::default()
                    .basename(&param.general.log_base)
                    .suffix(&param.general.log_suffix),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .start(),
        Ok(logger) => logger.start(),
        Err(e) => {
            eprintln!("Invalid log level {}: {}", param.general.log_level, e);
            return ExitCode::FAILURE;
        }
    };
    let _logger_handle = match logger {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Unable to start logger: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("gknapsack {}", gknapsack::version());

    let experiment = match run(&param) {
        Ok(experiment) => experiment,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    cinfo!(param.general.display_colorful, "{}", experiment.display());

    if !param.general.save_exp.is_empty() {
        match experiment.save_auto(&param.general.save_exp) {
            Ok(()) => info!("Experiment saved to {}", param.general.save_exp),
            Err(e) => {
                error!("Unable to save experiment: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
