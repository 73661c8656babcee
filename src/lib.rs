pub mod algorithm;
pub mod common;
pub mod config;
pub mod error;
pub mod experiment;
pub mod pddl;
pub mod planner;
pub mod puzzle;
pub mod scenario;
pub mod stat;
