//! Client-side record filtering and ordering.
//!
//! The live subscription is scoped to a user only, so every constraint here is
//! evaluated on the client after each push. This keeps the remote query free
//! of composite indexes at the cost of re-filtering the user's full record set;
//! it assumes per-user record counts stay small.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::{Record, RecordKind};

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Range between two days, both inclusive.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    fn contains(&self, day: NaiveDate) -> bool {
        self.start.is_none_or(|start| day >= start) && self.end.is_none_or(|end| day <= end)
    }
}

/// Inclusive amount bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl AmountRange {
    /// Bounds with non-finite values dropped and `-0.0` folded into `0.0`.
    fn normalized(&self) -> Self {
        fn bound(value: Option<f64>) -> Option<f64> {
            value
                .filter(|v| v.is_finite())
                .map(|v| if v == 0.0 { 0.0 } else { v })
        }
        Self {
            min: bound(self.min),
            max: bound(self.max),
        }
    }

    fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    fn contains(&self, amount: f64) -> bool {
        let range = self.normalized();
        range.min.is_none_or(|min| amount >= min) && range.max.is_none_or(|max| amount <= max)
    }
}

/// Immutable record filter.
///
/// Builder methods consume and return a new value; a changed filter is a
/// different query with its own cache key and subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RecordKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_range: Option<AmountRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
}

impl Filter {
    /// Filter that matches everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_amount_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.amount_range = Some(AmountRange { min, max });
        self
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    /// Drop constraints that cannot exclude anything.
    ///
    /// Empty category or search strings and ranges without bounds are the same
    /// query as leaving the field unset. A NaN or infinite amount bound counts
    /// as no bound.
    pub fn normalized(&self) -> Self {
        fn non_empty(value: &Option<String>) -> Option<String> {
            value.as_ref().filter(|s| !s.is_empty()).cloned()
        }

        Self {
            date_range: self.date_range.filter(|r| !r.is_unbounded()),
            category: non_empty(&self.category),
            kind: self.kind,
            amount_range: self
                .amount_range
                .map(|r| r.normalized())
                .filter(|r| !r.is_unbounded()),
            search_text: non_empty(&self.search_text),
        }
    }

    /// True when no constraint is active.
    pub fn is_empty(&self) -> bool {
        self.normalized() == Self::default()
    }

    /// Deterministic text form of the normalized filter.
    ///
    /// Fields are emitted in a fixed order and absent fields are omitted, so
    /// equal filters always produce the same string. Returns `None` for the
    /// match-everything filter.
    pub fn canonical(&self) -> Option<String> {
        let f = self.normalized();
        if f == Self::default() {
            return None;
        }

        let mut map = Map::new();
        if let Some(range) = f.date_range {
            map.insert(
                "dateRange".to_string(),
                serde_json::json!({
                    "start": range.start.map(|d| d.to_string()),
                    "end": range.end.map(|d| d.to_string()),
                }),
            );
        }
        if let Some(category) = f.category {
            map.insert("category".to_string(), Value::String(category));
        }
        if let Some(kind) = f.kind {
            map.insert("kind".to_string(), Value::String(kind.as_str().to_string()));
        }
        if let Some(range) = f.amount_range {
            map.insert(
                "amountRange".to_string(),
                serde_json::json!({ "min": range.min, "max": range.max }),
            );
        }
        if let Some(search) = f.search_text {
            map.insert("search".to_string(), Value::String(search));
        }
        Some(Value::Object(map).to_string())
    }

    /// Whether a single record satisfies every active constraint.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(kind) = self.kind
            && record.kind != kind
        {
            return false;
        }

        if let Some(category) = self.category.as_deref()
            && !category.is_empty()
            && record.category != category
        {
            return false;
        }

        if let Some(range) = &self.date_range
            && !range.contains(record.date.date_naive())
        {
            return false;
        }

        if let Some(search) = self.search_text.as_deref()
            && !search.is_empty()
            && !record
                .description
                .to_lowercase()
                .contains(&search.to_lowercase())
        {
            return false;
        }

        if let Some(range) = &self.amount_range
            && !range.contains(record.amount)
        {
            return false;
        }

        true
    }

    /// Filter then sort a snapshot.
    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        let mut kept: Vec<Record> = records.into_iter().filter(|r| self.matches(r)).collect();
        sort_records(&mut kept);
        kept
    }
}

/// Newest first: date descending, then creation time descending.
pub fn compare_recency(a: &Record, b: &Record) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Sort records newest first.
pub fn sort_records(records: &mut [Record]) {
    records.sort_by(compare_recency);
}
