use npuzzle_rust::config::{Cli, Config};
use npuzzle_rust::experiment::{run_experiments, solve_instance};
use npuzzle_rust::scenario::{generate, load_instance, save_instance};

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = std::fs::read_to_string(config_file)
            .with_context(|| format!("cannot read config file: {config_file}"))?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let mut rng = StdRng::seed_from_u64(config.seed);

    if !config.experiments.is_empty() {
        run_experiments(&config, &mut rng)?;
        return Ok(());
    }

    let (start, steps) = match &config.instance_path {
        Some(path) => (
            load_instance(path).with_context(|| format!("error loading instance: {path}"))?,
            0,
        ),
        None => (
            generate(config.side, config.steps, config.avoid_backtrack, &mut rng)?,
            config.steps,
        ),
    };
    if let Some(path) = &config.save_instance_path {
        save_instance(path, &start).with_context(|| format!("error saving instance: {path}"))?;
    }

    let record = solve_instance(&config, &start, steps, 1);
    if record.a_star.status != "success" {
        error!("A* did not solve the instance: {}", record.a_star.status);
    }
    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}
