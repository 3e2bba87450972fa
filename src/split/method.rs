//! Extension point for `method` allocations.
//!
//! The engine ships no concrete strategies. A resolver turns a descriptor
//! plus the layer context into an amount; the distributor then checks that
//! all method outputs of a rule add up to the rule's base.
use crate::core::currency::CurrencyCode;
use crate::core::ids::{RuleId, StakeholderId};
use crate::core::money::Money;
use crate::split::allocation::MethodDescriptor;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MethodError {
    #[error("unknown allocation method '{0}'")]
    Unknown(MethodDescriptor),
    #[error("method '{descriptor}' failed: {reason}")]
    Failed {
        descriptor: MethodDescriptor,
        reason: String,
    },
}

/// What a method strategy gets to see.
#[derive(Debug, Clone, Copy)]
pub struct MethodContext<'a> {
    pub rule_id: &'a RuleId,
    pub order: u32,
    pub stakeholder_id: &'a StakeholderId,
    pub settlement_currency: &'a CurrencyCode,
    /// The whole layer base.
    pub base: Money,
    /// Base minus what earlier method allocations of this rule returned.
    pub unresolved: Money,
}

pub trait MethodResolver: Send + Sync {
    fn resolve(
        &self,
        descriptor: &MethodDescriptor,
        context: &MethodContext<'_>,
    ) -> Result<Money, MethodError>;
}

/// Resolver for deployments without method strategies: rejects everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMethods;

impl MethodResolver for NoMethods {
    fn resolve(
        &self,
        descriptor: &MethodDescriptor,
        _context: &MethodContext<'_>,
    ) -> Result<Money, MethodError> {
        Err(MethodError::Unknown(descriptor.clone()))
    }
}

type MethodFn = dyn Fn(&MethodContext<'_>) -> Result<Money, String> + Send + Sync;

/// Named strategies looked up by descriptor.
///
/// # Examples
///
/// ```
/// use split_engine::core::money::Money;
/// use split_engine::split::method::MethodRegistry;
///
/// let mut registry = MethodRegistry::new();
/// registry.register("take-rest", |ctx| Ok(ctx.unresolved));
/// assert!(registry.contains("take-rest"));
/// ```
#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<String, Box<MethodFn>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, method: F)
    where
        F: Fn(&MethodContext<'_>) -> Result<Money, String> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Box::new(method));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("MethodRegistry").field("methods", &names).finish()
    }
}

impl MethodResolver for MethodRegistry {
    fn resolve(
        &self,
        descriptor: &MethodDescriptor,
        context: &MethodContext<'_>,
    ) -> Result<Money, MethodError> {
        let method = self
            .methods
            .get(descriptor.as_str())
            .ok_or_else(|| MethodError::Unknown(descriptor.clone()))?;
        method(context).map_err(|reason| MethodError::Failed {
            descriptor: descriptor.clone(),
            reason,
        })
    }
}

impl<M: MethodResolver + ?Sized> MethodResolver for &M {
    fn resolve(
        &self,
        descriptor: &MethodDescriptor,
        context: &MethodContext<'_>,
    ) -> Result<Money, MethodError> {
        (**self).resolve(descriptor, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context<'a>(rule: &'a RuleId, stakeholder: &'a StakeholderId, eur: &'a CurrencyCode) -> MethodContext<'a> {
        MethodContext {
            rule_id: rule,
            order: 1,
            stakeholder_id: stakeholder,
            settlement_currency: eur,
            base: Money::new(1_000),
            unresolved: Money::new(400),
        }
    }

    #[test]
    fn test_no_methods_rejects() {
        let (rule, s, eur) = (RuleId::new("r"), StakeholderId::new("s"), CurrencyCode::new("EUR"));
        let result = NoMethods.resolve(&MethodDescriptor::new("x"), &context(&rule, &s, &eur));
        assert!(matches!(result, Err(MethodError::Unknown(_))));
    }

    #[test]
    fn test_registry_resolves() {
        let mut registry = MethodRegistry::new();
        registry.register("rest", |ctx| Ok(ctx.unresolved));
        registry.register("broken", |_| Err("no occupancy data".to_string()));

        let (rule, s, eur) = (RuleId::new("r"), StakeholderId::new("s"), CurrencyCode::new("EUR"));
        let ctx = context(&rule, &s, &eur);
        assert_eq!(
            registry.resolve(&MethodDescriptor::new("rest"), &ctx).unwrap(),
            Money::new(400)
        );
        assert!(matches!(
            registry.resolve(&MethodDescriptor::new("broken"), &ctx),
            Err(MethodError::Failed { .. })
        ));
        assert!(matches!(
            registry.resolve(&MethodDescriptor::new("missing"), &ctx),
            Err(MethodError::Unknown(_))
        ));
    }
}
