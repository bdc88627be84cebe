use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use regsel_cli::pipeline::input::RegselConfig;
use regsel_cli::pipeline::predict::run_prediction;
use regsel_cli::pipeline::train::{format_outcome, run_training};
use regsel_models::TrainerError;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("REGSEL_LOG", "error,regsel=info"))
        .init();

    let matches = Command::new("regsel")
        .version(clap::crate_version!())
        .about("Regression model selection: grid search candidates, keep the best")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Ingest a table, search every candidate and persist the best model")
                .arg(
                    Arg::new("config")
                        .help("Path to the JSON configuration file")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Path to the input table (*.csv or *.tsv). Overrides the data path \
                             specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output_file")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "File path that the trained model will be written to. \
                             Overrides the model_path specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("quality_floor")
                        .long("quality-floor")
                        .help("Minimum test r2 a model must reach to be kept.")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("no_report")
                        .long("no-report")
                        .help("Disable HTML report generation.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Predict with a persisted model")
                .arg(
                    Arg::new("model_path")
                        .short('m')
                        .long("model")
                        .help("Path to the trained model file (*.json)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .help("Path to a table holding only feature columns (*.csv or *.tsv)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("preprocessor")
                        .short('p')
                        .long("preprocessor")
                        .help("Scaler saved by `regsel train` when scale_features is enabled")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output_file")
                        .help("Path to write predictions to, one per line. Defaults to stdout.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config_path: Option<&PathBuf> = matches.get_one("config");

    if config_path.is_none() && matches.get_one::<String>("data").is_none() {
        let template = serde_json::to_string_pretty(&RegselConfig::default())?;
        eprintln!("[regsel] No config file provided; printing the default configuration.");
        println!("{}", template);
        return Ok(());
    }

    if let Some(path) = config_path {
        log::info!("[regsel::train] Training from config: {:?}", path);
    }
    let config = match RegselConfig::from_arguments(config_path, matches) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {:#}", e);
            std::process::exit(1)
        }
    };

    match run_training(&config, !matches.get_flag("no_report")) {
        Ok(run) => {
            println!("{}", format_outcome(&run.outcome));
            log::info!(
                "Model saved to {}, metrics to {}",
                run.model_path.display(),
                run.metrics_path.display()
            );
            Ok(())
        }
        Err(e) => {
            let floor_failure = e
                .downcast_ref::<TrainerError>()
                .map_or(false, TrainerError::is_quality_floor);
            if floor_failure {
                log::error!("No usable model produced: {:#}", e);
            } else {
                log::error!("Training failed: {:#}", e);
            }
            std::process::exit(1)
        }
    }
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let model_path: &PathBuf = matches.get_one("model_path").unwrap();
    let data_path: &PathBuf = matches.get_one("data").unwrap();
    let preprocessor: Option<&PathBuf> = matches.get_one("preprocessor");
    let output: Option<&PathBuf> = matches.get_one("output_file");

    match run_prediction(
        model_path,
        data_path,
        preprocessor.map(PathBuf::as_path),
        output.map(PathBuf::as_path),
    ) {
        Ok(n) => {
            log::info!("[regsel::predict] Predicted {} rows", n);
            Ok(())
        }
        Err(e) => {
            log::error!("Prediction failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
