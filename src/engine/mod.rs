pub mod memory;
pub mod runner;
pub mod source;
