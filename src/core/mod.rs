//! Core data types and models

pub mod movie;
pub mod review;

pub use movie::*;
pub use review::*;
