#![deny(warnings)]

//! Headless CLI: load a scenario file and print the current simulated
//! period, the production budget and the pending credits.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sim_runtime::{SalesFilter, Session};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    scenario: Option<String>,
    now: Option<DateTime<Utc>>,
    month: Option<u32>,
    page: usize,
}

fn parse_args<I: IntoIterator<Item = String>>(raw: I) -> Result<Args> {
    let mut args = Args {
        page: 1,
        ..Args::default()
    };
    let mut it = raw.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => {
                args.scenario = Some(it.next().context("--scenario needs a file path")?);
            }
            "--now" => {
                let raw = it.next().context("--now needs an RFC 3339 timestamp")?;
                let ts = DateTime::parse_from_rfc3339(&raw)
                    .with_context(|| format!("invalid --now value {raw:?}"))?;
                args.now = Some(ts.with_timezone(&Utc));
            }
            "--month" => {
                let raw = it.next().context("--month needs a number")?;
                args.month = Some(
                    raw.parse()
                        .with_context(|| format!("invalid --month value {raw:?}"))?,
                );
            }
            "--page" => {
                let raw = it.next().context("--page needs a number")?;
                args.page = raw
                    .parse()
                    .with_context(|| format!("invalid --page value {raw:?}"))?;
            }
            other => bail!("unknown argument {other:?}"),
        }
    }
    Ok(args)
}

/// Filter built from a `RUST_LOG` style directive, `info` when unset or invalid.
fn log_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> Result<()> {
    let directive = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directive.as_deref()))
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    info!(?args, "starting CLI");

    let Some(path) = args.scenario.as_deref() else {
        bail!("usage: cli --scenario <file.yaml> [--now <rfc3339>] [--month <1-12>] [--page <n>]");
    };
    let scenario = persistence::load_scenario(path)
        .with_context(|| format!("loading scenario {path}"))?;
    let session = Session::from_scenario(scenario);
    let now = args.now.unwrap_or_else(Utc::now);

    let progress = session.month_progress(now)?;
    println!(
        "Period | month: {} | decade: {} | december: {} | elapsed: {} min",
        progress.current_month,
        progress.current_decade,
        progress.is_december,
        progress.elapsed_minutes
    );

    // past the horizon the budget view falls back to month 1
    let month = match args.month {
        Some(m) => sim_core::validate_budget_month(m)?,
        None if progress.current_month <= sim_core::BUDGET_MONTHS => progress.current_month,
        None => 1,
    };
    let table = session.projection_table()?;
    println!("Budget | month {month}");
    for row in table.month(month) {
        println!(
            "  {:<16} total: {:>8} | d1: {:>8} | d2: {:>8} | d3: {:>8}",
            row.product_id, row.total, row.d1, row.d2, row.d3
        );
    }
    if let Some(t) = table.totals_for(month) {
        println!(
            "  {:<16} total: {:>8} | d1: {:>8} | d2: {:>8} | d3: {:>8}",
            "TOTAL", t.total, t.d1, t.d2, t.d3
        );
    }

    if session.origin().is_some() {
        let page = session.pending_credits(now, args.page)?;
        println!("Credits | page {} of {}", page.page, page.total_pages);
        for view in &page.items {
            println!(
                "  {:<10} due: {} | amount: {:>10} | {}",
                view.credit.id,
                view.due_date.format("%Y-%m-%d"),
                view.credit.total_cost,
                view.status()
            );
        }
        let summary = session.receivables(now)?;
        println!(
            "Receivables | collectible: {} ({}) | pending: {} ({}) | total: {}",
            summary.collectible_count,
            summary.collectible_total,
            summary.pending_count,
            summary.pending_total,
            summary.total()?
        );

        let (_, period) = session.clock(now)?;
        let sales = session.sales_records(&SalesFilter::for_period(&period), None, 1);
        let sold: Decimal = sales.items.iter().map(|r| r.total).sum();
        println!("Sales | period {period} | records: {} | sold: {sold}", sales.items.len());
    }

    Ok(())
}
