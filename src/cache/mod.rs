//! Catalog snapshot cache, rating broadcast and snapshot persistence

pub mod bus;
pub mod catalog;
pub mod store;

pub use bus::*;
pub use catalog::*;
pub use store::*;
