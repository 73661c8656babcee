use rand::prelude::*;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::puzzle::State;

/// Random walk of `steps` moves from the goal of the given side. Every board
/// reached this way can be solved back to the goal.
///
/// With `avoid_backtrack` the walk never steps straight back to the board it
/// just left, as long as another move exists.
pub fn generate<R: Rng + ?Sized>(
    side: usize,
    steps: usize,
    avoid_backtrack: bool,
    rng: &mut R,
) -> Result<State> {
    let mut current = State::goal(side)?;
    let mut previous: Option<State> = None;

    for _ in 0..steps {
        let mut neighbors = current.neighbors();
        if avoid_backtrack && neighbors.len() > 1 {
            if let Some(previous) = &previous {
                neighbors.retain(|neighbor| neighbor != previous);
            }
        }

        // Every board with side >= 2 has at least two moves.
        let Some(next) = neighbors.choose(rng).cloned() else {
            break;
        };
        previous = Some(std::mem::replace(&mut current, next));
    }

    debug!("generated instance (side {side}, steps {steps}):\n{current}");
    Ok(current)
}

pub fn load_instance(path: impl AsRef<Path>) -> Result<State> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let state: State = serde_yaml::from_reader(reader)?;
    info!("Load instance from {}", path.as_ref().display());
    Ok(state)
}

pub fn save_instance(path: impl AsRef<Path>, state: &State) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = io::BufWriter::new(file);
    let yaml_data = serde_yaml::to_string(state)?;
    writer.write_all(yaml_data.as_bytes())?;
    writer.flush()?;

    Ok(())
}
