//! Displayed rating computation

pub mod aggregator;

pub use aggregator::*;
