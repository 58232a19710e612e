pub mod control;
pub mod grid;
pub mod queue;
pub mod strategy;
pub mod worker;
