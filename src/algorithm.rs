mod astar;

pub use astar::a_star_search;

use std::collections::HashMap;
use std::rc::Rc;

use crate::common::Path;
use crate::puzzle::State;

type Trace = HashMap<Rc<State>, Rc<State>>;

fn construct_path(trace: &Trace, mut current: Rc<State>) -> Path {
    let mut path = vec![State::clone(&current)];
    while let Some(parent) = trace.get(&current) {
        path.push(State::clone(parent));
        current = Rc::clone(parent);
    }
    path.reverse();
    path
}
