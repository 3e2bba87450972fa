use crate::core::ids::PropertyId;
use crate::core::transaction::ResolvedComponent;
use crate::error::{SourceError, ValidationError};
use crate::split::plan::SplitPlan;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open evaluation window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::EmptyPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whole days from `first` up to and including `last`.
    pub fn from_dates(first: NaiveDate, last: NaiveDate) -> Result<Self, ValidationError> {
        let start = first.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
        let end = last
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|t| t.and_utc());
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Err(ValidationError::UnknownReference {
                kind: "date",
                id: last.to_string(),
            }),
        }
    }

    /// Everything representable, for "all time" queries.
    pub fn unbounded() -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Supplies a property's active plan.
pub trait PlanSource {
    /// `Ok(None)` when the property has no active plan.
    fn load_active_plan(&self, property_id: &PropertyId) -> Result<Option<SplitPlan>, SourceError>;
}

/// Supplies the resolved transaction components of a property for a period.
pub trait ComponentSource {
    fn load_components(
        &self,
        property_id: &PropertyId,
        period: &Period,
    ) -> Result<Vec<ResolvedComponent>, SourceError>;
}
