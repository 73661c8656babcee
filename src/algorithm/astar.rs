use super::{construct_path, Trace};
use crate::common::{OpenNode, SearchResult};
use crate::puzzle::State;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, trace};

/// Optimal A* over the sliding-tile graph with the Manhattan heuristic.
///
/// Closed boards are never reopened; this is safe because the heuristic is
/// consistent. Superseded open entries stay in the open list and are dropped
/// when popped. The timeout is polled once per iteration, before each pop.
#[instrument(skip_all, name = "a_star", fields(side = start.side(), h = start.manhattan()), level = "debug")]
pub fn a_star_search(start: &State, timeout: Duration) -> SearchResult {
    let search_start_time = Instant::now();

    let mut open_list = BTreeSet::new();
    let mut closed_list: HashSet<Rc<State>> = HashSet::new();
    let mut g_score: HashMap<Rc<State>, usize> = HashMap::new();
    let mut trace: Trace = HashMap::new();

    let mut sequence: u64 = 0;
    let mut nodes_expanded = 0;

    let start = Rc::new(start.clone());
    g_score.insert(Rc::clone(&start), 0);
    open_list.insert(OpenNode {
        f_cost: start.manhattan(),
        g_cost: 0,
        sequence,
        state: start,
    });

    loop {
        let elapsed = search_start_time.elapsed();
        if elapsed > timeout {
            debug!("timeout after {nodes_expanded} expansions");
            return SearchResult::Timeout {
                elapsed,
                nodes_expanded,
            };
        }

        let Some(current) = open_list.pop_first() else {
            break;
        };

        // Superseded entry.
        if closed_list.contains(&current.state) {
            continue;
        }

        if current.state.is_goal() {
            let elapsed = search_start_time.elapsed();
            debug!(
                "solved: cost {}, expanded {nodes_expanded}, {:?}",
                current.g_cost, elapsed
            );
            return SearchResult::Success {
                path: construct_path(&trace, current.state),
                nodes_expanded,
                elapsed,
            };
        }

        trace!(
            "expand node: f {} g {} seq {}",
            current.f_cost,
            current.g_cost,
            current.sequence
        );
        closed_list.insert(Rc::clone(&current.state));
        nodes_expanded += 1;

        // Uniform move cost.
        let tentative_g_cost = current.g_cost + 1;

        for neighbor in current.state.neighbors() {
            if closed_list.contains(&neighbor) {
                continue;
            }

            if g_score
                .get(&neighbor)
                .is_some_and(|&g_cost| g_cost <= tentative_g_cost)
            {
                continue;
            }

            let neighbor = Rc::new(neighbor);
            g_score.insert(Rc::clone(&neighbor), tentative_g_cost);
            trace.insert(Rc::clone(&neighbor), Rc::clone(&current.state));

            sequence += 1;
            open_list.insert(OpenNode {
                f_cost: tentative_g_cost + neighbor.manhattan(),
                g_cost: tentative_g_cost,
                sequence,
                state: neighbor,
            });
        }
    }

    debug!("cannot find solution after {nodes_expanded} expansions");
    SearchResult::Failure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::generate;

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::VecDeque;

    const TIMEOUT: Duration = Duration::from_secs(30);

    // Helper function to setup tracing
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .try_init();
    }

    // Breadth-first distances from the goal, up to `max_depth` moves. Moves are
    // reversible, so these are also the distances to the goal.
    fn bfs_distances(side: usize, max_depth: usize) -> HashMap<State, usize> {
        let goal = State::goal(side).unwrap();
        let mut distances = HashMap::from([(goal.clone(), 0)]);
        let mut queue = VecDeque::from([goal]);

        while let Some(state) = queue.pop_front() {
            let depth = distances[&state];
            if depth == max_depth {
                continue;
            }
            for neighbor in state.neighbors() {
                if !distances.contains_key(&neighbor) {
                    distances.insert(neighbor.clone(), depth + 1);
                    queue.push_back(neighbor);
                }
            }
        }

        distances
    }

    fn assert_valid_path(path: &[State]) {
        assert!(path.last().unwrap().is_goal());
        for pair in path.windows(2) {
            assert!(pair[0].neighbors().contains(&pair[1]));
        }
    }

    #[test]
    fn test_a_star_goal_start() {
        init_tracing();
        let goal = State::goal(3).unwrap();
        match a_star_search(&goal, TIMEOUT) {
            SearchResult::Success {
                path,
                nodes_expanded,
                ..
            } => {
                assert_eq!(path.len(), 1);
                assert_eq!(nodes_expanded, 0);
                assert_eq!(path[0], goal);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_a_star_one_move() {
        init_tracing();
        for start in State::goal(3).unwrap().neighbors() {
            match a_star_search(&start, TIMEOUT) {
                SearchResult::Success { path, .. } => {
                    assert_eq!(path.len(), 2);
                    assert_eq!(path[0], start);
                    assert_valid_path(&path);
                }
                other => panic!("expected success, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_a_star_optimal_against_bfs() {
        init_tracing();
        let distances = bfs_distances(3, 10);
        for (start, distance) in &distances {
            let result = a_star_search(start, TIMEOUT);
            assert_eq!(result.solution_length(), Some(*distance), "start:\n{start}");
            if let SearchResult::Success { path, .. } = result {
                assert_eq!(&path[0], start);
                assert_valid_path(&path);
            }
        }
    }

    #[test]
    fn test_a_star_full_two_by_two() {
        init_tracing();
        // The solvable half of the 2x2 board has 12 states.
        let distances = bfs_distances(2, usize::MAX);
        assert_eq!(distances.len(), 12);
        for (start, distance) in &distances {
            assert_eq!(a_star_search(start, TIMEOUT).solution_length(), Some(*distance));
        }
    }

    #[test]
    fn test_manhattan_admissible() {
        for (side, depth) in [(3, 14), (4, 10)] {
            let distances = bfs_distances(side, depth);
            for (state, distance) in &distances {
                assert!(state.manhattan() <= *distance, "state:\n{state}");
            }
        }
    }

    #[test]
    fn test_a_star_generated_instances_terminate() {
        init_tracing();
        let mut rng = StdRng::seed_from_u64(0);
        for steps in (0..=30).step_by(3) {
            for _ in 0..3 {
                let start = generate(3, steps, false, &mut rng).unwrap();
                let result = a_star_search(&start, TIMEOUT);
                assert!(result.is_success(), "steps {steps}: {result:?}");
                assert!(result.solution_length().unwrap() <= steps);
            }
        }
    }

    #[test]
    fn test_a_star_unsolvable() {
        init_tracing();
        // Odd permutation of the 2x2 goal.
        let start = State::new(vec![2, 1, 3, 0], 2).unwrap();
        assert!(matches!(
            a_star_search(&start, TIMEOUT),
            SearchResult::Failure
        ));
    }

    #[test]
    fn test_a_star_timeout() {
        init_tracing();
        let mut rng = StdRng::seed_from_u64(7);
        let start = generate(5, 400, true, &mut rng).unwrap();
        match a_star_search(&start, Duration::from_nanos(1)) {
            SearchResult::Timeout { nodes_expanded, .. } => assert!(nodes_expanded <= 1),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
