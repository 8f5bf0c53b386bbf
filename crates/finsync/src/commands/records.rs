//! Records command - run the filter and sort pipeline over an export.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use console::Style;
use finsync_types::{DateRange, Filter, Record, RecordKind};

use super::{Context, read_records};

/// Arguments for the records command.
#[derive(Args, Debug)]
pub struct RecordsArgs {
    /// JSON file holding an array of records
    #[arg(short, long)]
    pub file: PathBuf,

    /// Only income or expense records
    #[arg(long)]
    pub kind: Option<RecordKind>,

    /// Exact category match
    #[arg(long)]
    pub category: Option<String>,

    /// Earliest record date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Latest record date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Minimum amount (inclusive)
    #[arg(long)]
    pub min: Option<f64>,

    /// Maximum amount (inclusive)
    #[arg(long)]
    pub max: Option<f64>,

    /// Case-insensitive text search
    #[arg(short, long)]
    pub search: Option<String>,

    /// Show at most this many records
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

impl RecordsArgs {
    fn filter(&self) -> Filter {
        let mut filter = Filter::all();
        if let Some(kind) = self.kind {
            filter = filter.with_kind(kind);
        }
        if let Some(category) = &self.category {
            filter = filter.with_category(category.clone());
        }
        if self.from.is_some() || self.to.is_some() {
            filter = filter.with_date_range(DateRange {
                start: self.from,
                end: self.to,
            });
        }
        if self.min.is_some() || self.max.is_some() {
            filter = filter.with_amount_range(self.min, self.max);
        }
        if let Some(search) = &self.search {
            filter = filter.with_search(search.clone());
        }
        filter.normalized()
    }
}

/// Run the records command.
pub async fn run(args: RecordsArgs, ctx: &Context) -> Result<()> {
    let records = read_records(&args.file)?;
    let total = records.len();
    let filter = args.filter();
    let mut matched = filter.apply(records);
    tracing::debug!(total, matched = matched.len(), filter = ?filter, "Filtered records");
    if let Some(limit) = args.limit {
        matched.truncate(limit);
    }

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&matched)?);
    } else {
        print_table(&matched, total);
    }
    Ok(())
}

fn print_table(records: &[Record], total: usize) {
    let dim = Style::new().dim();
    let green = Style::new().green();
    let red = Style::new().red();

    for record in records {
        let amount = format!("{:>10.2}", record.signed_amount());
        let amount = match record.kind {
            RecordKind::Income => green.apply_to(amount),
            RecordKind::Expense => red.apply_to(amount),
        };
        println!(
            "{}  {}  {:<16} {}",
            record.date.format("%Y-%m-%d"),
            amount,
            record.category,
            record.description
        );
    }
    println!(
        "{}",
        dim.apply_to(format!("{} of {} records", records.len(), total))
    );
}
