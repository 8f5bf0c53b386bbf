//! Dashboard aggregates derived from a user's records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::sort_records;
use crate::record::{Record, RecordKind};
use crate::window::ReportWindow;

const TOP_CATEGORY_LIMIT: usize = 5;
const RECENT_RECORD_LIMIT: usize = 10;

/// Aggregated expense for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: String,
    pub amount: f64,
    /// Share of total expense, 0-100.
    pub percentage: f64,
    #[serde(rename = "type")]
    pub kind: RecordKind,
}

/// Slim projection of a record for the recent list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRecord {
    pub id: String,
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub category: String,
    pub date: DateTime<Utc>,
}

impl From<&Record> for RecentRecord {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            description: record.description.clone(),
            amount: record.amount,
            kind: record.kind,
            category: record.category.clone(),
            date: record.date,
        }
    }
}

/// Income and expense for one `YYYY-MM` month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    pub month: String,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    pub income: f64,
    pub expense: f64,
}

/// Derived dashboard view over one reporting window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub total_balance: f64,
    pub monthly_income: f64,
    pub monthly_expense: f64,
    /// `total_balance / monthly_income` as a percentage; 0 without income.
    pub savings_rate: f64,
    pub top_categories: Vec<CategorySummary>,
    #[serde(alias = "recentTransactions")]
    pub recent_records: Vec<RecentRecord>,
    pub monthly_trend: Vec<MonthlyTrend>,
    pub expense_distribution: Vec<CategorySummary>,
    pub cash_flow: CashFlow,
}

impl DashboardData {
    /// Compute aggregates for the records that fall inside `window`.
    pub fn compute(records: &[Record], window: &ReportWindow, now: DateTime<Utc>) -> Self {
        let mut in_window: Vec<Record> = records
            .iter()
            .filter(|r| window.contains(r.date, now))
            .cloned()
            .collect();
        sort_records(&mut in_window);

        let (income, expense) = in_window.iter().fold((0.0, 0.0), |(inc, exp), r| match r.kind {
            RecordKind::Income => (inc + r.amount, exp),
            RecordKind::Expense => (inc, exp + r.amount),
        });
        let balance = income - expense;
        let savings_rate = if income > 0.0 {
            balance / income * 100.0
        } else {
            0.0
        };

        let expense_distribution = expense_by_category(&in_window, expense);
        let top_categories = expense_distribution
            .iter()
            .take(TOP_CATEGORY_LIMIT)
            .cloned()
            .collect();

        Self {
            total_balance: balance,
            monthly_income: income,
            monthly_expense: expense,
            savings_rate,
            top_categories,
            recent_records: in_window
                .iter()
                .take(RECENT_RECORD_LIMIT)
                .map(RecentRecord::from)
                .collect(),
            monthly_trend: monthly_trend(&in_window),
            expense_distribution,
            cash_flow: CashFlow { income, expense },
        }
    }

    /// `(balance, income, expense)`, the values that decide whether a new
    /// computation is worth emitting.
    pub fn headline(&self) -> (f64, f64, f64) {
        (self.total_balance, self.monthly_income, self.monthly_expense)
    }
}

/// Expense categories sorted by amount descending, then name.
fn expense_by_category(records: &[Record], total_expense: f64) -> Vec<CategorySummary> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records.iter().filter(|r| r.kind == RecordKind::Expense) {
        *totals.entry(record.category.as_str()).or_default() += record.amount;
    }

    let mut summaries: Vec<CategorySummary> = totals
        .into_iter()
        .map(|(category, amount)| CategorySummary {
            category: category.to_string(),
            amount,
            percentage: if total_expense > 0.0 {
                amount / total_expense * 100.0
            } else {
                0.0
            },
            kind: RecordKind::Expense,
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.category.cmp(&b.category))
    });
    summaries
}

fn monthly_trend(records: &[Record]) -> Vec<MonthlyTrend> {
    let mut months: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for record in records {
        let entry = months.entry(record.month_key()).or_default();
        match record.kind {
            RecordKind::Income => entry.0 += record.amount,
            RecordKind::Expense => entry.1 += record.amount,
        }
    }
    months
        .into_iter()
        .map(|(month, (income, expense))| MonthlyTrend {
            month,
            income,
            expense,
            balance: income - expense,
        })
        .collect()
}

/// Chart flavour returned by the remote chart query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Doughnut,
}

/// Pre-shaped chart series from the remote dashboard repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub title: String,
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, kind: RecordKind, amount: f64, category: &str, day: u32, month: u32) -> Record {
        let date = Utc.with_ymd_and_hms(2025, month, day, 12, 0, 0).unwrap();
        Record {
            id: id.to_string(),
            description: id.to_string(),
            amount,
            kind,
            category: category.to_string(),
            date,
            created_at: date,
            updated_at: date,
            receipt_ref: None,
            notes: None,
            tags: Vec::new(),
        }
    }

    fn march() -> ReportWindow {
        ReportWindow::Month { year: 2025, month: 3 }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 2, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_march_totals() {
        let records = vec![
            record("salary", RecordKind::Income, 1000.0, "Salary", 5, 3),
            record("groceries", RecordKind::Expense, 300.0, "Food", 10, 3),
            record("bus", RecordKind::Expense, 200.0, "Transport", 1, 4),
        ];
        let data = DashboardData::compute(&records, &march(), now());

        assert_eq!(data.monthly_income, 1000.0);
        assert_eq!(data.monthly_expense, 300.0);
        assert_eq!(data.total_balance, 700.0);
        assert!((data.savings_rate - 70.0).abs() < 1e-9);
        assert_eq!(data.cash_flow, CashFlow { income: 1000.0, expense: 300.0 });
        assert_eq!(data.recent_records.len(), 2);
        assert_eq!(data.recent_records[0].id, "groceries");
        assert_eq!(data.headline(), (700.0, 1000.0, 300.0));
    }

    #[test]
    fn test_no_income_means_zero_savings_rate() {
        let records = vec![record("rent", RecordKind::Expense, 800.0, "Housing", 1, 3)];
        let data = DashboardData::compute(&records, &march(), now());
        assert_eq!(data.savings_rate, 0.0);
        assert_eq!(data.total_balance, -800.0);
    }

    #[test]
    fn test_top_categories_limited_and_ranked() {
        let records: Vec<Record> = ["A", "B", "C", "D", "E", "F", "G"]
            .iter()
            .enumerate()
            .map(|(i, cat)| {
                record(&format!("r{i}"), RecordKind::Expense, (i as f64 + 1.0) * 10.0, cat, 2, 3)
            })
            .collect();
        let data = DashboardData::compute(&records, &march(), now());

        let names: Vec<_> = data.top_categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["G", "F", "E", "D", "C"]);
        assert_eq!(data.expense_distribution.len(), 7);

        let share: f64 = data.expense_distribution.iter().map(|c| c.percentage).sum();
        assert!((share - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_recent_records_capped_at_ten() {
        let records: Vec<Record> = (1..=15)
            .map(|d| record(&format!("r{d}"), RecordKind::Expense, 1.0, "Food", d, 3))
            .collect();
        let data = DashboardData::compute(&records, &march(), now());
        assert_eq!(data.recent_records.len(), 10);
        assert_eq!(data.recent_records[0].id, "r15");
    }

    #[test]
    fn test_monthly_trend_ascending() {
        let records = vec![
            record("b", RecordKind::Expense, 50.0, "Food", 3, 2),
            record("a", RecordKind::Income, 100.0, "Salary", 3, 1),
            record("c", RecordKind::Income, 70.0, "Salary", 9, 2),
        ];
        let data = DashboardData::compute(&records, &ReportWindow::Year { year: 2025 }, now());
        let months: Vec<_> = data.monthly_trend.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2025-01", "2025-02"]);
        assert_eq!(data.monthly_trend[1].balance, 20.0);
    }

    #[test]
    fn test_empty_window() {
        let data = DashboardData::compute(&[], &march(), now());
        assert_eq!(data, DashboardData::default());
    }
}
