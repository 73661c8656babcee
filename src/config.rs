use anyhow::{anyhow, bail, Context};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::pddl::DEFAULT_PROBLEM_NAME;
use crate::planner::{Planner, DEFAULT_SEARCH};
use crate::puzzle::MAX_SIDE;

#[derive(Parser, Debug, Default)]
#[command(
    name = "Rust N-Puzzle",
    about = "A* sliding-tile puzzle solver, cross-checked against an external PDDL planner.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Board side N (the N²-1 puzzle)")]
    pub side: Option<usize>,

    #[arg(long, help = "Random moves applied to the goal to build an instance")]
    pub steps: Option<usize>,

    #[arg(long, help = "Seed for the random number generator")]
    pub seed: Option<u64>,

    #[arg(long, help = "A* time budget in seconds")]
    pub timeout_secs: Option<f64>,

    #[arg(
        long,
        help = "Never undo the previous move while shuffling",
        default_value_t = false
    )]
    pub avoid_backtrack: bool,

    #[arg(long, help = "Load the start board from a YAML instance file")]
    pub instance_path: Option<String>,

    #[arg(long, help = "Write the start board to a YAML instance file")]
    pub save_instance_path: Option<String>,

    #[arg(
        long,
        help = "Batch experiments as <side>x<steps>, e.g. 4x30,5x20",
        use_value_delimiter = true
    )]
    pub experiments: Vec<String>,

    #[arg(long, help = "Runs per experiment")]
    pub runs: Option<usize>,

    #[arg(long, help = "Planner executable; the planner is skipped when unset")]
    pub planner_program: Option<String>,

    #[arg(
        long,
        help = "Arguments placed before the PDDL files, e.g. the path to fast-downward.py",
        use_value_delimiter = true,
        allow_hyphen_values = true
    )]
    pub planner_args: Vec<String>,

    #[arg(long, help = "Planner search configuration")]
    pub planner_search: Option<String>,

    #[arg(long, help = "Planner time budget in seconds, 0 waits forever")]
    pub planner_timeout_secs: Option<u64>,

    #[arg(long, help = "Directory for PDDL files and planner output")]
    pub work_dir: Option<String>,

    #[arg(long, help = "Path to the JSON lines result file")]
    pub output_path: Option<String>,

    #[arg(long, help = "Problem name written into the PDDL problem")]
    pub problem_name: Option<String>,
}

/// One batch experiment, written `<side>x<steps>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Experiment {
    pub side: usize,
    pub steps: usize,
}

impl FromStr for Experiment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (side, steps) = s
            .trim()
            .split_once('x')
            .ok_or_else(|| anyhow!("experiment must look like <side>x<steps>, got {s:?}"))?;
        Ok(Experiment {
            side: side
                .parse()
                .with_context(|| format!("bad side in experiment {s:?}"))?,
            steps: steps
                .parse()
                .with_context(|| format!("bad steps in experiment {s:?}"))?,
        })
    }
}

impl TryFrom<String> for Experiment {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        s.parse()
    }
}

impl From<Experiment> for String {
    fn from(experiment: Experiment) -> Self {
        experiment.to_string()
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.side, self.steps)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlannerConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_search")]
    pub search: String,
    /// 0 waits forever.
    #[serde(default = "default_planner_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_search() -> String {
    DEFAULT_SEARCH.to_string()
}

fn default_planner_timeout_secs() -> u64 {
    300
}

impl PlannerConfig {
    pub fn new(program: String) -> Self {
        PlannerConfig {
            program,
            args: Vec::new(),
            search: default_search(),
            timeout_secs: default_planner_timeout_secs(),
        }
    }

    pub fn to_planner(&self) -> Planner {
        Planner {
            program: self.program.clone(),
            program_args: self.args.clone(),
            search: self.search.clone(),
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub side: usize,
    pub steps: usize,
    pub seed: u64,
    pub timeout_secs: f64,
    pub avoid_backtrack: bool,
    pub instance_path: Option<String>,
    pub save_instance_path: Option<String>,
    pub experiments: Vec<Experiment>,
    pub runs: usize,
    pub planner: Option<PlannerConfig>,
    pub work_dir: String,
    pub output_path: String,
    pub problem_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            side: 4,
            steps: 30,
            seed: 0,
            timeout_secs: 60.0,
            avoid_backtrack: false,
            instance_path: None,
            save_instance_path: None,
            experiments: Vec::new(),
            runs: 1,
            planner: None,
            work_dir: "work".to_string(),
            output_path: "result/result.jsonl".to_string(),
            problem_name: DEFAULT_PROBLEM_NAME.to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Applies every option given on the command line on top of `self`, then
    /// validates the result.
    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(side) = cli.side {
            self.side = side;
        }
        if let Some(steps) = cli.steps {
            self.steps = steps;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(timeout_secs) = cli.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        if cli.avoid_backtrack {
            self.avoid_backtrack = true;
        }
        if let Some(path) = &cli.instance_path {
            self.instance_path = Some(path.clone());
        }
        if let Some(path) = &cli.save_instance_path {
            self.save_instance_path = Some(path.clone());
        }
        if !cli.experiments.is_empty() {
            self.experiments = cli
                .experiments
                .iter()
                .map(|experiment| experiment.parse())
                .collect::<anyhow::Result<_>>()?;
        }
        if let Some(runs) = cli.runs {
            self.runs = runs;
        }

        if let Some(program) = &cli.planner_program {
            self.planner
                .get_or_insert_with(|| PlannerConfig::new(program.clone()))
                .program = program.clone();
        }
        match self.planner.as_mut() {
            Some(planner) => {
                if !cli.planner_args.is_empty() {
                    planner.args = cli.planner_args.clone();
                }
                if let Some(search) = &cli.planner_search {
                    planner.search = search.clone();
                }
                if let Some(timeout_secs) = cli.planner_timeout_secs {
                    planner.timeout_secs = timeout_secs;
                }
            }
            None => {
                if !cli.planner_args.is_empty()
                    || cli.planner_search.is_some()
                    || cli.planner_timeout_secs.is_some()
                {
                    bail!("planner options need --planner-program or a planner section in the config file");
                }
            }
        }

        if let Some(work_dir) = &cli.work_dir {
            self.work_dir = work_dir.clone();
        }
        if let Some(output_path) = &cli.output_path {
            self.output_path = output_path.clone();
        }
        if let Some(problem_name) = &cli.problem_name {
            self.problem_name = problem_name.clone();
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let check_side = |side: usize| {
            if !(2..=MAX_SIDE).contains(&side) {
                return Err(anyhow!(
                    "Side must be between 2 and {MAX_SIDE}, got {side}"
                ));
            }
            Ok(())
        };

        check_side(self.side)?;
        for experiment in &self.experiments {
            check_side(experiment.side).with_context(|| format!("experiment {experiment}"))?;
        }

        if self.timeout_secs <= 0.0 || Duration::try_from_secs_f64(self.timeout_secs).is_err() {
            bail!("Timeout must be a positive number of seconds, got {}", self.timeout_secs);
        }

        if self.runs == 0 {
            bail!("Runs must be at least 1");
        }

        if let Some(planner) = &self.planner {
            if planner.program.trim().is_empty() {
                bail!("Planner program must not be empty");
            }
        }

        if self.problem_name.is_empty() || self.problem_name.contains(char::is_whitespace) {
            bail!("Problem name must be a single non-empty word, got {:?}", self.problem_name);
        }

        Ok(())
    }

    /// Saturates instead of panicking on values `validate` would reject.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(config.planner.is_none());
    }

    #[test]
    fn test_from_yaml_str() {
        let config = Config::from_yaml_str(
            "side: 5\n\
             steps: 60\n\
             experiments: [\"4x30\", \"5x100\"]\n\
             runs: 3\n\
             planner:\n  program: python3\n  args: [/opt/fast-downward/fast-downward.py]\n",
        )
        .unwrap();
        assert_eq!(config.side, 5);
        assert_eq!(config.steps, 60);
        assert_eq!(
            config.experiments,
            vec![
                Experiment { side: 4, steps: 30 },
                Experiment { side: 5, steps: 100 }
            ]
        );
        let planner = config.planner.as_ref().unwrap();
        assert_eq!(planner.search, DEFAULT_SEARCH);
        assert_eq!(planner.timeout_secs, 300);
        // untouched fields keep their defaults
        assert_eq!(config.timeout_secs, 60.0);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_yaml_str_rejects_unknown_and_malformed() {
        assert!(Config::from_yaml_str("sidee: 3\n").is_err());
        assert!(Config::from_yaml_str("experiments: [\"4by30\"]\n").is_err());
    }

    #[test]
    fn test_override_from_command_line() {
        let cli = Cli::parse_from([
            "npuzzle",
            "--side",
            "3",
            "--timeout-secs",
            "2.5",
            "--experiments",
            "3x10,4x20",
            "--planner-program",
            "python3",
            "--planner-args",
            "fast-downward.py",
            "--planner-timeout-secs",
            "0",
        ]);
        let config = Config::default().override_from_command_line(&cli).unwrap();
        assert_eq!(config.side, 3);
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert_eq!(config.experiments.len(), 2);

        let planner = config.planner.unwrap().to_planner();
        assert_eq!(planner.program, "python3");
        assert_eq!(planner.program_args, vec!["fast-downward.py".to_string()]);
        assert_eq!(planner.timeout, None);
    }

    #[test]
    fn test_override_keeps_config_planner() {
        let config = Config::from_yaml_str("planner:\n  program: fd\n  timeout_secs: 20\n").unwrap();
        let cli = Cli::parse_from(["npuzzle", "--planner-search", "astar(blind())"]);
        let config = config.override_from_command_line(&cli).unwrap();
        let planner = config.planner.unwrap();
        assert_eq!(planner.program, "fd");
        assert_eq!(planner.search, "astar(blind())");
        assert_eq!(planner.timeout_secs, 20);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cli = Cli::parse_from(["npuzzle", "--side", "1"]);
        assert!(Config::default().override_from_command_line(&cli).is_err());

        let cli = Cli::parse_from(["npuzzle", "--timeout-secs", "0"]);
        assert!(Config::default().override_from_command_line(&cli).is_err());

        // Too large for a Duration.
        let cli = Cli::parse_from(["npuzzle", "--timeout-secs", "1e20"]);
        assert!(Config::default().override_from_command_line(&cli).is_err());
        let config = Config {
            timeout_secs: 1e20,
            ..Config::default()
        };
        assert_eq!(config.timeout(), Duration::MAX);

        let cli = Cli::parse_from(["npuzzle", "--runs", "0"]);
        assert!(Config::default().override_from_command_line(&cli).is_err());

        let cli = Cli::parse_from(["npuzzle", "--experiments", "1x5"]);
        assert!(Config::default().override_from_command_line(&cli).is_err());

        let cli = Cli::parse_from(["npuzzle", "--planner-search", "astar(blind())"]);
        assert!(Config::default().override_from_command_line(&cli).is_err());
    }

    #[test]
    fn test_experiment_parse() {
        let experiment: Experiment = "6x100".parse().unwrap();
        assert_eq!(experiment, Experiment { side: 6, steps: 100 });
        assert_eq!(experiment.to_string(), "6x100");
        assert!("6x".parse::<Experiment>().is_err());
        assert!("x6".parse::<Experiment>().is_err());
    }
}
