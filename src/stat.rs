use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::SearchResult;
use crate::planner::PlanResult;

/// What one solving path reports for a run. Fields that do not apply are 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub status: String,
    pub time_secs: f64,
    pub expanded_nodes: u64,
    /// Moves, not boards.
    pub solution_length: usize,
}

impl From<&SearchResult> for Stats {
    fn from(result: &SearchResult) -> Self {
        Stats {
            status: result.status().to_string(),
            time_secs: result.elapsed().as_secs_f64(),
            expanded_nodes: result.nodes_expanded() as u64,
            solution_length: result.solution_length().unwrap_or(0),
        }
    }
}

impl From<&PlanResult> for Stats {
    fn from(result: &PlanResult) -> Self {
        Stats {
            status: result.status.as_str().to_string(),
            time_secs: result.search_time.unwrap_or(0.0),
            expanded_nodes: result.expanded_nodes.unwrap_or(0),
            solution_length: result.plan_length,
        }
    }
}

/// One row of an experiment: the instance parameters and both solvers' stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub side: usize,
    pub steps: usize,
    pub run_id: usize,
    pub a_star: Stats,
    pub planner: Stats,
}

impl RunRecord {
    pub(crate) fn print(&self) {
        info!(
            "N {} steps {} run {} | A* {} time {:.4}s nodes {} len {} | planner {} time {:.4}s nodes {} len {}",
            self.side,
            self.steps,
            self.run_id,
            self.a_star.status,
            self.a_star.time_secs,
            self.a_star.expanded_nodes,
            self.a_star.solution_length,
            self.planner.status,
            self.planner.time_secs,
            self.planner.expanded_nodes,
            self.planner.solution_length,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::decode;
    use crate::puzzle::State;
    use std::time::Duration;

    #[test]
    fn test_stats_from_search_result() {
        let goal = State::goal(3).unwrap();
        let start = goal.neighbors().remove(0);
        let result = SearchResult::Success {
            path: vec![start, goal],
            nodes_expanded: 1,
            elapsed: Duration::from_millis(250),
        };
        let stats = Stats::from(&result);
        assert_eq!(stats.status, "success");
        assert_eq!(stats.expanded_nodes, 1);
        assert_eq!(stats.solution_length, 1);
        assert!((stats.time_secs - 0.25).abs() < 1e-9);

        let stats = Stats::from(&SearchResult::Failure);
        assert_eq!(stats.status, "failure");
        assert_eq!(stats.solution_length, 0);
        assert_eq!(stats.time_secs, 0.0);
    }

    #[test]
    fn test_stats_from_plan_result() {
        let result = decode("Expanded 3 state(s).\nTotal time: 1.5s\n", None);
        let stats = Stats::from(&result);
        assert_eq!(stats.status, "failure");
        assert_eq!(stats.solution_length, 0);
        assert_eq!(stats.expanded_nodes, 3);
        assert_eq!(stats.time_secs, 1.5);
    }

    #[test]
    fn test_record_json_line() {
        let record = RunRecord {
            side: 4,
            steps: 30,
            run_id: 1,
            a_star: Stats {
                status: "timeout".to_string(),
                time_secs: 120.0,
                expanded_nodes: 10,
                solution_length: 0,
            },
            planner: Stats::default(),
        };
        let line = serde_json::to_string(&record).unwrap();
        assert!(!line.contains('\n'));
        let parsed: RunRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, record);
    }
}
