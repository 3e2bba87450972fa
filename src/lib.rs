//! # split-engine
//!
//! Layered allocation engine for shared property finances.
//!
//! A property's active split plan is an ordered list of layers. Each layer
//! claims a base amount out of the period's transaction components (selected
//! categories, profit, or whatever earlier layers left over) and distributes
//! it across stakeholders by percent, fixed amount or a pluggable method.
//! Every minor unit is accounted for: the per-stakeholder totals always sum to
//! the layer bases.
//!
//! ## Architecture
//!
//! - **core**: Foundational types: money, currencies, identifiers, transactions, ledger
//! - **split**: Base selectors, layers, allocations and the distributor
//! - **engine**: Collaborator seams, the in-memory store and the plan runner
//! - **simulation**: Random scenario generation for benchmarks and smoke tests

pub mod core;
pub mod engine;
pub mod error;
pub mod scenario;
pub mod settings;
pub mod simulation;
pub mod split;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::currency::{Currency, CurrencyCode, CurrencyTable};
    pub use crate::core::ids::{
        AllocationId, CategoryId, ComponentId, ContactId, PlanId, PropertyId, RuleId,
        StakeholderId, TransactionId,
    };
    pub use crate::core::ledger::StakeholderLedger;
    pub use crate::core::money::Money;
    pub use crate::core::transaction::{
        ResolvedComponent, Transaction, TransactionComponent, TransactionType,
    };
    pub use crate::engine::memory::InMemoryStore;
    pub use crate::engine::runner::{EvaluationResult, LayerBreakdown, SplitPlanRunner};
    pub use crate::engine::source::{ComponentSource, Period, PlanSource};
    pub use crate::error::{AllocationError, SplitError, ValidationError};
    pub use crate::split::allocation::{Allocation, MethodDescriptor, Share};
    pub use crate::split::method::{MethodContext, MethodRegistry, MethodResolver, NoMethods};
    pub use crate::split::plan::SplitPlan;
    pub use crate::split::rule::SplitRule;
    pub use crate::split::selector::{BaseMode, BaseSelector};
}
