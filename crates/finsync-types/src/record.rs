//! Finance records (transactions) as projected from the remote store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::Filter;

/// Whether a record adds to or subtracts from the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Income,
    /// Documents without a kind are treated as expenses.
    #[default]
    Expense,
}

impl RecordKind {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Income => "income",
            RecordKind::Expense => "expense",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "income" => Ok(RecordKind::Income),
            "expense" => Ok(RecordKind::Expense),
            other => Err(format!("unknown record kind: {}", other)),
        }
    }
}

/// A single income or expense entry.
///
/// Owned by the remote store; the client only ever holds read-only copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: RecordKind,
    #[serde(default)]
    pub category: String,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "receiptUrl")]
    pub receipt_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Record {
    /// Signed contribution to the balance.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            RecordKind::Income => self.amount,
            RecordKind::Expense => -self.amount,
        }
    }

    /// `YYYY-MM` of the record date.
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

/// Payload for creating a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub category: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl RecordDraft {
    /// Create a draft with the required fields.
    pub fn new(
        description: impl Into<String>,
        amount: f64,
        kind: RecordKind,
        category: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            description: description.into(),
            amount,
            kind,
            category: category.into(),
            date,
            receipt_ref: None,
            notes: None,
            tags: Vec::new(),
        }
    }

    /// Attach notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Materialize into a stored record.
    pub fn into_record(self, id: impl Into<String>, now: DateTime<Utc>) -> Record {
        Record {
            id: id.into(),
            description: self.description,
            amount: self.amount,
            kind: self.kind,
            category: self.category,
            date: self.date,
            created_at: now,
            updated_at: now,
            receipt_ref: self.receipt_ref,
            notes: self.notes,
            tags: self.tags,
        }
    }
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<RecordKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl RecordPatch {
    /// Apply this patch to a record, bumping `updated_at`.
    pub fn apply_to(&self, record: &mut Record, now: DateTime<Utc>) {
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(amount) = self.amount {
            record.amount = amount;
        }
        if let Some(kind) = self.kind {
            record.kind = kind;
        }
        if let Some(category) = &self.category {
            record.category = category.clone();
        }
        if let Some(date) = self.date {
            record.date = date;
        }
        if let Some(receipt_ref) = &self.receipt_ref {
            record.receipt_ref = Some(receipt_ref.clone());
        }
        if let Some(notes) = &self.notes {
            record.notes = Some(notes.clone());
        }
        if let Some(tags) = &self.tags {
            record.tags = tags.clone();
        }
        record.updated_at = now;
    }
}

/// A receipt file to attach to a record.
#[derive(Debug, Clone)]
pub struct ReceiptUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Paginated list query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuery {
    #[serde(default)]
    pub filter: Filter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Opaque continuation cursor from a previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl RecordQuery {
    /// Query everything matching `filter`.
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            page_size: None,
            cursor: None,
        }
    }

    /// Limit the page size.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Continue from a cursor.
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Deterministic representation used for cache keys.
    ///
    /// Returns `None` for the unfiltered, unpaginated query.
    pub fn canonical(&self) -> Option<String> {
        let filter = self.filter.canonical();
        if filter.is_none() && self.page_size.is_none() && self.cursor.is_none() {
            return None;
        }
        let value = serde_json::json!({
            "filter": filter,
            "pageSize": self.page_size,
            "cursor": self.cursor,
        });
        Some(value.to_string())
    }
}

/// One page of list results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage {
    pub records: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_tolerant_decoding_defaults_kind_to_expense() {
        let record: Record = serde_json::from_str(
            r#"{"id":"r1","amount":12.5,"date":"2025-03-05T10:00:00Z","createdAt":"2025-03-05T10:00:00Z","updatedAt":"2025-03-05T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(record.kind, RecordKind::Expense);
        assert_eq!(record.description, "");
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_kind_wire_format() {
        let json = serde_json::to_string(&RecordKind::Income).unwrap();
        assert_eq!(json, "\"income\"");
        assert_eq!("EXPENSE".parse::<RecordKind>().unwrap(), RecordKind::Expense);
        assert!("transfer".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_patch_updates_only_given_fields() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let mut record = RecordDraft::new("Lunch", 20.0, RecordKind::Expense, "Food", now)
            .into_record("r1", now);

        let later = now + chrono::Duration::hours(1);
        let patch = RecordPatch {
            amount: Some(25.0),
            ..Default::default()
        };
        patch.apply_to(&mut record, later);

        assert_eq!(record.amount, 25.0);
        assert_eq!(record.description, "Lunch");
        assert_eq!(record.updated_at, later);
        assert_eq!(record.created_at, now);
    }

    #[test]
    fn test_unfiltered_query_has_no_canonical_form() {
        assert_eq!(RecordQuery::default().canonical(), None);
        assert!(RecordQuery::default().with_page_size(20).canonical().is_some());
    }

    #[test]
    fn test_cursor_value_distinguishes_pages() {
        let page2 = RecordQuery::default().with_page_size(20).with_cursor("c2");
        let page3 = RecordQuery::default().with_page_size(20).with_cursor("c3");
        assert_ne!(page2.canonical(), page3.canonical());
    }
}
