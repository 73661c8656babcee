use crate::puzzle::State;

use std::cmp::Ordering;
use std::rc::Rc;
use std::time::Duration;

/// Boards from start to goal, both ends included.
pub type Path = Vec<State>;

#[derive(Debug, Clone)]
pub enum SearchResult {
    Success {
        path: Path,
        nodes_expanded: usize,
        elapsed: Duration,
    },
    Timeout {
        elapsed: Duration,
        nodes_expanded: usize,
    },
    /// Open list ran dry. Only an unsolvable board gets here.
    Failure,
}

impl SearchResult {
    pub fn status(&self) -> &'static str {
        match self {
            SearchResult::Success { .. } => "success",
            SearchResult::Timeout { .. } => "timeout",
            SearchResult::Failure => "failure",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SearchResult::Success { .. })
    }

    pub fn nodes_expanded(&self) -> usize {
        match self {
            SearchResult::Success { nodes_expanded, .. }
            | SearchResult::Timeout { nodes_expanded, .. } => *nodes_expanded,
            SearchResult::Failure => 0,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            SearchResult::Success { elapsed, .. } | SearchResult::Timeout { elapsed, .. } => {
                *elapsed
            }
            SearchResult::Failure => Duration::ZERO,
        }
    }

    /// Number of moves, one less than the number of boards on the path.
    pub fn solution_length(&self) -> Option<usize> {
        match self {
            SearchResult::Success { path, .. } => Some(path.len().saturating_sub(1)),
            _ => None,
        }
    }
}

// Open list entry. The sequence number is unique per search, so the order is
// total without ever comparing boards.
#[derive(Debug, Clone)]
pub(crate) struct OpenNode {
    pub(crate) state: Rc<State>,
    pub(crate) f_cost: usize,
    pub(crate) g_cost: usize,
    pub(crate) sequence: u64,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_cost
            .cmp(&other.f_cost)
            // Lower g first on f ties, then first inserted.
            .then_with(|| self.g_cost.cmp(&other.g_cost))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn node(f_cost: usize, g_cost: usize, sequence: u64) -> OpenNode {
        OpenNode {
            state: Rc::new(State::goal(2).unwrap()),
            f_cost,
            g_cost,
            sequence,
        }
    }

    #[test]
    fn test_open_node_order() {
        let mut open = BTreeSet::new();
        open.insert(node(5, 3, 0));
        open.insert(node(4, 2, 1));
        open.insert(node(4, 1, 2));
        open.insert(node(4, 1, 3));

        let order: Vec<u64> = std::iter::from_fn(|| open.pop_first())
            .map(|node| node.sequence)
            .collect();
        assert_eq!(order, vec![2, 3, 1, 0]);
    }

    #[test]
    fn test_same_state_different_sequence_kept() {
        let mut open = BTreeSet::new();
        assert!(open.insert(node(4, 1, 0)));
        assert!(open.insert(node(4, 1, 1)));
        assert_eq!(open.len(), 2);
    }

    #[test]
    fn test_result_accessors() {
        let goal = State::goal(3).unwrap();
        let result = SearchResult::Success {
            path: vec![goal],
            nodes_expanded: 0,
            elapsed: Duration::from_millis(1),
        };
        assert_eq!(result.status(), "success");
        assert_eq!(result.solution_length(), Some(0));

        let result = SearchResult::Timeout {
            elapsed: Duration::from_secs(2),
            nodes_expanded: 17,
        };
        assert_eq!(result.status(), "timeout");
        assert_eq!(result.nodes_expanded(), 17);
        assert_eq!(result.solution_length(), None);

        assert_eq!(SearchResult::Failure.nodes_expanded(), 0);
        assert_eq!(SearchResult::Failure.elapsed(), Duration::ZERO);
    }
}
