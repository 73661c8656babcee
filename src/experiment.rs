use anyhow::{Context, Result};
use rand::Rng;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, instrument};

use crate::algorithm::a_star_search;
use crate::config::{Config, Experiment};
use crate::pddl::encode;
use crate::puzzle::State;
use crate::scenario::generate;
use crate::stat::{RunRecord, Stats};

/// Solves `start` with A* and, when a planner is configured, with the planner
/// in its own directory under `config.work_dir`.
#[instrument(skip_all, fields(side = start.side(), steps, run_id), level = "debug")]
pub fn solve_instance(config: &Config, start: &State, steps: usize, run_id: usize) -> RunRecord {
    info!("start:\n{start}");

    let a_star_result = a_star_search(start, config.timeout());
    let a_star = Stats::from(&a_star_result);

    let planner = match &config.planner {
        Some(planner_config) => {
            let work_dir = Path::new(&config.work_dir).join(format!(
                "n{}_s{steps}_r{run_id}",
                start.side()
            ));
            let encoding = encode(start, &config.problem_name);
            let plan_result = planner_config.to_planner().solve(&encoding, &work_dir);
            Stats::from(&plan_result)
        }
        None => Stats {
            status: "skipped".to_string(),
            ..Stats::default()
        },
    };

    let record = RunRecord {
        side: start.side(),
        steps,
        run_id,
        a_star,
        planner,
    };
    record.print();
    record
}

/// Runs every configured experiment `config.runs` times and appends one JSON
/// line per run to `config.output_path`.
pub fn run_experiments<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> Result<Vec<RunRecord>> {
    let output_path = Path::new(&config.output_path);
    if let Some(parent) = output_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let file = File::create(output_path)
        .with_context(|| format!("cannot create {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    info!(
        "Running {} experiments x {} runs, results in {}",
        config.experiments.len(),
        config.runs,
        output_path.display()
    );

    let mut records = Vec::with_capacity(config.experiments.len() * config.runs);
    for &Experiment { side, steps } in &config.experiments {
        info!("--- N={side}, shuffle={steps} ---");
        for run_id in 1..=config.runs {
            let start = generate(side, steps, config.avoid_backtrack, rng)?;
            let record = solve_instance(config, &start, steps, run_id);

            serde_json::to_writer(&mut writer, &record)?;
            writeln!(writer)?;
            // Keep finished runs on disk if a later one hangs.
            writer.flush()?;

            records.push(record);
        }
    }

    info!("Benchmark done, {} records written", records.len());
    Ok(records)
}
