use crate::core::ids::{CategoryId, ComponentId};
use crate::core::money::Money;
use crate::core::transaction::{ResolvedComponent, TransactionType};
use crate::error::ValidationError;
use crate::split::rule::LayerAccumulator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Where a layer's base amount comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseMode {
    /// Components filtered by category and transaction type.
    Categories,
    /// Income minus expenses over every component.
    Profit,
    /// The period's fund minus what lower layers already allocated.
    Remaining,
}

impl fmt::Display for BaseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Categories => write!(f, "categories"),
            Self::Profit => write!(f, "profit"),
            Self::Remaining => write!(f, "remaining"),
        }
    }
}

/// Category restriction of a `categories` selector. Include and exclude are
/// mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    Include(BTreeSet<CategoryId>),
    Exclude(BTreeSet<CategoryId>),
}

impl CategoryFilter {
    /// Uncategorised components never match an include list and always pass
    /// an exclude list.
    pub fn matches(&self, category: Option<&CategoryId>) -> bool {
        match (self, category) {
            (Self::Include(ids), Some(id)) => ids.contains(id),
            (Self::Include(_), None) => false,
            (Self::Exclude(ids), Some(id)) => !ids.contains(id),
            (Self::Exclude(_), None) => true,
        }
    }
}

fn yes() -> bool {
    true
}

/// Unvalidated selector shape, as stored on a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorDescriptor {
    pub mode: BaseMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_category_ids: Option<Vec<CategoryId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_category_ids: Option<Vec<CategoryId>>,
    #[serde(default = "yes")]
    pub include_income: bool,
    #[serde(default = "yes")]
    pub include_expenses: bool,
}

impl SelectorDescriptor {
    pub fn new(mode: BaseMode) -> Self {
        Self {
            mode,
            include_category_ids: None,
            exclude_category_ids: None,
            include_income: true,
            include_expenses: true,
        }
    }
}

/// Decides which components feed a layer and what they add up to.
///
/// Always valid once constructed: deserialization goes through
/// [`BaseSelector::create`].
///
/// # Examples
///
/// ```
/// use split_engine::core::ids::CategoryId;
/// use split_engine::split::selector::{BaseMode, BaseSelector, SelectorDescriptor};
///
/// let rent_only = BaseSelector::include_categories([CategoryId::new("rent")]).unwrap();
/// assert_eq!(rent_only.mode(), BaseMode::Categories);
///
/// // categories mode without a filter is rejected
/// assert!(BaseSelector::create(SelectorDescriptor::new(BaseMode::Categories)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SelectorDescriptor", into = "SelectorDescriptor")]
pub struct BaseSelector {
    mode: BaseMode,
    filter: Option<CategoryFilter>,
    include_income: bool,
    include_expenses: bool,
}

/// Components a layer selected and the signed base they produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub component_ids: Vec<ComponentId>,
    pub base: Money,
}

impl BaseSelector {
    pub fn create(descriptor: SelectorDescriptor) -> Result<Self, ValidationError> {
        let include = non_empty(descriptor.include_category_ids);
        let exclude = non_empty(descriptor.exclude_category_ids);

        let filter = match descriptor.mode {
            BaseMode::Categories => {
                if !descriptor.include_income && !descriptor.include_expenses {
                    return Err(ValidationError::NoTransactionTypeSelected);
                }
                match (include, exclude) {
                    (Some(_), Some(_)) => return Err(ValidationError::ConflictingCategoryFilters),
                    (Some(ids), None) => Some(CategoryFilter::Include(ids)),
                    (None, Some(ids)) => Some(CategoryFilter::Exclude(ids)),
                    (None, None) => return Err(ValidationError::MissingCategoryFilter),
                }
            }
            mode @ (BaseMode::Profit | BaseMode::Remaining) => {
                if include.is_some() || exclude.is_some() {
                    return Err(ValidationError::UnexpectedCategoryFilter { mode });
                }
                None
            }
        };

        Ok(Self {
            mode: descriptor.mode,
            filter,
            include_income: descriptor.include_income,
            include_expenses: descriptor.include_expenses,
        })
    }

    pub fn profit() -> Self {
        Self {
            mode: BaseMode::Profit,
            filter: None,
            include_income: true,
            include_expenses: true,
        }
    }

    pub fn remaining() -> Self {
        Self {
            mode: BaseMode::Remaining,
            filter: None,
            include_income: true,
            include_expenses: true,
        }
    }

    pub fn include_categories(
        ids: impl IntoIterator<Item = CategoryId>,
    ) -> Result<Self, ValidationError> {
        let mut descriptor = SelectorDescriptor::new(BaseMode::Categories);
        descriptor.include_category_ids = Some(ids.into_iter().collect());
        Self::create(descriptor)
    }

    pub fn exclude_categories(
        ids: impl IntoIterator<Item = CategoryId>,
    ) -> Result<Self, ValidationError> {
        let mut descriptor = SelectorDescriptor::new(BaseMode::Categories);
        descriptor.exclude_category_ids = Some(ids.into_iter().collect());
        Self::create(descriptor)
    }

    /// Restrict a `categories` selector to income components.
    pub fn income_only(mut self) -> Self {
        self.include_income = true;
        self.include_expenses = false;
        self
    }

    /// Restrict a `categories` selector to expense components.
    pub fn expenses_only(mut self) -> Self {
        self.include_income = false;
        self.include_expenses = true;
        self
    }

    pub fn mode(&self) -> BaseMode {
        self.mode
    }

    pub fn filter(&self) -> Option<&CategoryFilter> {
        self.filter.as_ref()
    }

    fn accepts(&self, component: &ResolvedComponent) -> bool {
        let type_ok = match component.kind {
            TransactionType::Income => self.include_income,
            TransactionType::Expense => self.include_expenses,
        };
        type_ok
            && self
                .filter
                .as_ref()
                .map_or(true, |f| f.matches(component.category_id.as_ref()))
    }

    /// Resolve the base against the period's components, already expressed
    /// in the settlement currency.
    ///
    /// With both types included a `categories` base is signed (income minus
    /// expenses); with one type it is that type's absolute magnitude.
    pub fn select(&self, components: &[ResolvedComponent], acc: &LayerAccumulator) -> Selection {
        match self.mode {
            BaseMode::Categories => {
                let picked: Vec<&ResolvedComponent> =
                    components.iter().filter(|c| self.accepts(c)).collect();
                let base = if self.include_income && self.include_expenses {
                    picked.iter().map(|c| c.signed_amount()).sum::<Money>()
                } else {
                    picked.iter().map(|c| c.amount).sum::<Money>().abs()
                };
                Selection {
                    component_ids: picked.iter().map(|c| c.component_id.clone()).collect(),
                    base,
                }
            }
            BaseMode::Profit => Selection {
                component_ids: components.iter().map(|c| c.component_id.clone()).collect(),
                base: components.iter().map(|c| c.signed_amount()).sum(),
            },
            BaseMode::Remaining => Selection {
                component_ids: components
                    .iter()
                    .filter(|c| c.is_income())
                    .map(|c| c.component_id.clone())
                    .collect(),
                base: acc.remaining(),
            },
        }
    }
}

fn non_empty(ids: Option<Vec<CategoryId>>) -> Option<BTreeSet<CategoryId>> {
    ids.filter(|ids| !ids.is_empty())
        .map(|ids| ids.into_iter().collect())
}

impl TryFrom<SelectorDescriptor> for BaseSelector {
    type Error = ValidationError;

    fn try_from(descriptor: SelectorDescriptor) -> Result<Self, Self::Error> {
        Self::create(descriptor)
    }
}

impl From<BaseSelector> for SelectorDescriptor {
    fn from(selector: BaseSelector) -> Self {
        let (include, exclude) = match selector.filter {
            Some(CategoryFilter::Include(ids)) => (Some(ids.into_iter().collect()), None),
            Some(CategoryFilter::Exclude(ids)) => (None, Some(ids.into_iter().collect())),
            None => (None, None),
        };
        Self {
            mode: selector.mode,
            include_category_ids: include,
            exclude_category_ids: exclude,
            include_income: selector.include_income,
            include_expenses: selector.include_expenses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;
    use crate::core::ids::TransactionId;

    fn component(id: &str, kind: TransactionType, category: Option<&str>, amount: i64) -> ResolvedComponent {
        ResolvedComponent {
            component_id: ComponentId::new(id),
            transaction_id: TransactionId::new(format!("tx-{id}")),
            kind,
            category_id: category.map(CategoryId::new),
            amount: Money::new(amount),
            currency: CurrencyCode::new("EUR"),
        }
    }

    fn period() -> Vec<ResolvedComponent> {
        vec![
            component("rent", TransactionType::Income, Some("rent"), 5_000),
            component("cleaning", TransactionType::Income, Some("cleaning"), 1_000),
            component("repair", TransactionType::Expense, Some("maintenance"), 700),
            component("misc", TransactionType::Expense, None, 300),
        ]
    }

    fn fresh() -> LayerAccumulator {
        LayerAccumulator::new(Money::new(6_000))
    }

    #[test]
    fn test_include_categories() {
        let selector = BaseSelector::include_categories([CategoryId::new("rent")]).unwrap();
        let selection = selector.select(&period(), &fresh());
        assert_eq!(selection.base, Money::new(5_000));
        assert_eq!(selection.component_ids, vec![ComponentId::new("rent")]);
    }

    #[test]
    fn test_exclude_categories_signed() {
        let selector = BaseSelector::exclude_categories([CategoryId::new("cleaning")]).unwrap();
        let selection = selector.select(&period(), &fresh());
        // 5000 - 700 - 300, uncategorised passes an exclude list
        assert_eq!(selection.base, Money::new(4_000));
        assert_eq!(selection.component_ids.len(), 3);
    }

    #[test]
    fn test_expenses_only_is_magnitude() {
        let selector = BaseSelector::exclude_categories([CategoryId::new("rent")])
            .unwrap()
            .expenses_only();
        let selection = selector.select(&period(), &fresh());
        assert_eq!(selection.base, Money::new(1_000));
    }

    #[test]
    fn test_uncategorised_never_included() {
        let selector = BaseSelector::include_categories([CategoryId::new("maintenance")]).unwrap();
        let selection = selector.select(&period(), &fresh());
        assert_eq!(selection.base, Money::new(-700));
    }

    #[test]
    fn test_profit() {
        let selection = BaseSelector::profit().select(&period(), &fresh());
        assert_eq!(selection.base, Money::new(5_000));
        assert_eq!(selection.component_ids.len(), 4);
    }

    #[test]
    fn test_remaining_uses_accumulator() {
        let acc = fresh().record(1, Money::new(2_500));
        let selection = BaseSelector::remaining().select(&period(), &acc);
        assert_eq!(selection.base, Money::new(3_500));
        assert_eq!(selection.component_ids.len(), 2);
    }

    #[test]
    fn test_categories_requires_filter() {
        let result = BaseSelector::create(SelectorDescriptor::new(BaseMode::Categories));
        assert_eq!(result, Err(ValidationError::MissingCategoryFilter));
    }

    #[test]
    fn test_empty_lists_count_as_missing() {
        let mut descriptor = SelectorDescriptor::new(BaseMode::Categories);
        descriptor.include_category_ids = Some(vec![]);
        descriptor.exclude_category_ids = Some(vec![]);
        assert_eq!(
            BaseSelector::create(descriptor),
            Err(ValidationError::MissingCategoryFilter)
        );
    }

    #[test]
    fn test_include_and_exclude_conflict() {
        let mut descriptor = SelectorDescriptor::new(BaseMode::Categories);
        descriptor.include_category_ids = Some(vec![CategoryId::new("rent")]);
        descriptor.exclude_category_ids = Some(vec![CategoryId::new("tax")]);
        assert_eq!(
            BaseSelector::create(descriptor),
            Err(ValidationError::ConflictingCategoryFilters)
        );
    }

    #[test]
    fn test_profit_rejects_filters() {
        let mut descriptor = SelectorDescriptor::new(BaseMode::Profit);
        descriptor.exclude_category_ids = Some(vec![CategoryId::new("tax")]);
        assert_eq!(
            BaseSelector::create(descriptor),
            Err(ValidationError::UnexpectedCategoryFilter { mode: BaseMode::Profit })
        );
    }

    #[test]
    fn test_no_type_selected() {
        let mut descriptor = SelectorDescriptor::new(BaseMode::Categories);
        descriptor.include_category_ids = Some(vec![CategoryId::new("rent")]);
        descriptor.include_income = false;
        descriptor.include_expenses = false;
        assert_eq!(
            BaseSelector::create(descriptor),
            Err(ValidationError::NoTransactionTypeSelected)
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: BaseSelector =
            serde_json::from_str(r#"{"mode": "categories", "include_category_ids": ["rent"]}"#)
                .unwrap();
        assert!(matches!(ok.filter(), Some(CategoryFilter::Include(_))));

        let bad: Result<BaseSelector, _> =
            serde_json::from_str(r#"{"mode": "remaining", "include_category_ids": ["rent"]}"#);
        assert!(bad.is_err());
    }
}
