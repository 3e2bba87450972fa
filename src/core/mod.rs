pub mod currency;
pub mod ids;
pub mod ledger;
pub mod money;
pub mod stakeholder;
pub mod transaction;
