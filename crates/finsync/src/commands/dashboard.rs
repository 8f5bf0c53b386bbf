//! Dashboard command - compute aggregates offline from an export.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use console::{Style, style};
use finsync_types::{DashboardData, Period, ReportWindow};

use super::{Context, read_records};

/// Arguments for the dashboard command.
#[derive(Args, Debug)]
pub struct DashboardArgs {
    /// JSON file holding an array of records
    #[arg(short, long)]
    pub file: PathBuf,

    /// Reporting period: week, month or year
    #[arg(short, long, default_value = "month")]
    pub period: Period,

    /// Period key (YYYY-MM, or YYYY for a year); defaults to the current period
    #[arg(short, long)]
    pub key: Option<String>,
}

/// Run the dashboard command.
pub async fn run(args: DashboardArgs, ctx: &Context) -> Result<()> {
    let now = Utc::now();
    let window = match &args.key {
        Some(key) => ReportWindow::parse(args.period, key)?,
        None => ReportWindow::current(args.period, now),
    };
    let records = read_records(&args.file)?;
    let data = DashboardData::compute(&records, &window, now);

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        print_summary(&window, &data);
    }
    Ok(())
}

fn print_summary(window: &ReportWindow, data: &DashboardData) {
    let dim = Style::new().dim();

    println!();
    println!("{} {}", style("Dashboard").bold(), dim.apply_to(window));
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {:.2}", dim.apply_to("Income:"), data.monthly_income);
    println!("  {} {:.2}", dim.apply_to("Expense:"), data.monthly_expense);
    println!("  {} {:.2}", dim.apply_to("Balance:"), data.total_balance);
    println!("  {} {:.1}%", dim.apply_to("Savings rate:"), data.savings_rate);

    if !data.top_categories.is_empty() {
        println!();
        println!("  {}", dim.apply_to("Top expense categories:"));
        for summary in &data.top_categories {
            println!(
                "    {:<16} {:>10.2}  {:>5.1}%",
                summary.category, summary.amount, summary.percentage
            );
        }
    }

    if !data.monthly_trend.is_empty() {
        println!();
        println!("  {}", dim.apply_to("Monthly trend:"));
        for month in &data.monthly_trend {
            println!(
                "    {}  +{:.2}  -{:.2}  = {:.2}",
                month.month, month.income, month.expense, month.balance
            );
        }
    }
    println!();
}
