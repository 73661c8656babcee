//! Typed STRIPS encoding of a sliding-tile board.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::puzzle::{State, DIRECTIONS};

pub const DOMAIN_NAME: &str = "n-puzzle";
pub const DEFAULT_PROBLEM_NAME: &str = "npuzzle";
pub const DOMAIN_FILE: &str = "domain.pddl";
pub const PROBLEM_FILE: &str = "problem.pddl";

const DOMAIN: &str = "(define (domain n-puzzle)
  (:requirements :strips :typing)
  (:types location tile)
  (:predicates
    (at ?t - tile ?l - location)
    (empty ?l - location)
    (adjacent ?l1 ?l2 - location)
  )

  (:action slide
    :parameters (?t - tile ?from - location ?to - location)
    :precondition (and (at ?t ?from) (empty ?to) (adjacent ?from ?to))
    :effect (and (not (at ?t ?from)) (not (empty ?to))
                 (at ?t ?to) (empty ?from))
  )
)
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    pub domain: String,
    pub problem: String,
}

impl Encoding {
    /// Writes `domain.pddl` and `problem.pddl` into `dir`.
    pub fn write_to(&self, dir: &Path) -> io::Result<(PathBuf, PathBuf)> {
        let domain_path = dir.join(DOMAIN_FILE);
        let problem_path = dir.join(PROBLEM_FILE);
        fs::write(&domain_path, &self.domain)?;
        fs::write(&problem_path, &self.problem)?;
        Ok((domain_path, problem_path))
    }
}

pub fn encode(state: &State, problem_name: &str) -> Encoding {
    Encoding {
        domain: DOMAIN.to_string(),
        problem: Problem {
            state,
            name: problem_name,
        }
        .to_string(),
    }
}

struct Location(usize, usize);

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pos_{}_{}", self.0, self.1)
    }
}

struct Problem<'a> {
    state: &'a State,
    name: &'a str,
}

impl Problem<'_> {
    fn location(&self, index: usize) -> Location {
        let side = self.state.side();
        Location(index / side, index % side)
    }
}

impl fmt::Display for Problem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = self.state.side();
        let len = side * side;

        writeln!(f, "(define (problem {})", self.name)?;
        writeln!(f, "  (:domain {DOMAIN_NAME})")?;

        writeln!(f, "  (:objects")?;
        write!(f, "   ")?;
        for index in 0..len {
            write!(f, " {}", self.location(index))?;
        }
        writeln!(f, " - location")?;
        write!(f, "   ")?;
        for tile in 1..len {
            write!(f, " tile_{tile}")?;
        }
        writeln!(f, " - tile")?;
        writeln!(f, "  )")?;

        writeln!(f, "  (:init")?;
        // Grid edges in both directions, in the same order the board moves.
        for row in 0..side {
            for col in 0..side {
                for &(dx, dy) in &DIRECTIONS {
                    let (Some(next_row), Some(next_col)) =
                        (row.checked_add_signed(dx), col.checked_add_signed(dy))
                    else {
                        continue;
                    };
                    if next_row >= side || next_col >= side {
                        continue;
                    }
                    writeln!(
                        f,
                        "    (adjacent {} {})",
                        Location(row, col),
                        Location(next_row, next_col)
                    )?;
                }
            }
        }
        for (index, &value) in self.state.cells().iter().enumerate() {
            match value {
                0 => writeln!(f, "    (empty {})", self.location(index))?,
                tile => writeln!(f, "    (at tile_{tile} {})", self.location(index))?,
            }
        }
        writeln!(f, "  )")?;

        writeln!(f, "  (:goal (and")?;
        for tile in 1..len {
            writeln!(f, "    (at tile_{tile} {})", self.location(tile - 1))?;
        }
        writeln!(f, "  ))")?;
        writeln!(f, ")")
    }
}
