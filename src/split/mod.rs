pub mod allocation;
pub mod distributor;
pub mod method;
pub mod plan;
pub mod rule;
pub mod selector;
