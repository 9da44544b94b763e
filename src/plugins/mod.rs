pub mod chart;
pub mod core;
pub mod input;
pub mod viewmap;
