//! Visit filtering.

use crate::model::{ParkType, VisitData};
use crate::types::RecordId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive calendar-date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Conjunction of optional clauses. An unset clause matches everything,
/// and so does an empty companion list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub park_type: Option<ParkType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,

    /// Matches visits sharing any of these companions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion_ids: Option<Vec<RecordId>>,
}

impl VisitFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn park(mut self, park_type: ParkType) -> Self {
        self.park_type = Some(park_type);
        self
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange::new(start, end));
        self
    }

    pub fn with_companions(mut self, ids: Vec<RecordId>) -> Self {
        self.companion_ids = Some(ids);
        self
    }

    pub fn matches(&self, visit: &VisitData) -> bool {
        if let Some(park_type) = self.park_type {
            if visit.park_type != park_type {
                return false;
            }
        }

        if let Some(range) = &self.date_range {
            if !range.contains(visit.date) {
                return false;
            }
        }

        match &self.companion_ids {
            Some(ids) if !ids.is_empty() => {
                visit.companion_ids.iter().any(|id| ids.contains(id))
            }
            _ => true,
        }
    }
}
