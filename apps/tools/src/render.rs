//! Plain-text views of the sheet. Redraws are scoped by the change that
//! triggered them, the same way a page would patch only the affected cells.

use allocation::{Change, Derived};
use shared::{
    domain::Record,
    numeric::{format_amount, format_hours},
};

const CURRENCY: &str = "₹";

struct Grid {
    rows: Vec<Vec<String>>,
    widths: Vec<usize>,
}

impl Grid {
    fn build(record: &Record, derived: &Derived) -> Self {
        let mut header = vec!["#".to_string(), "Worker".to_string()];
        header.extend(record.companies().iter().cloned());
        header.push("Total Hours".to_string());

        let mut rows = vec![header];
        for (index, worker) in record.workers().iter().enumerate() {
            let mut row = vec![index.to_string(), worker.name.clone()];
            row.extend((0..record.company_count()).map(|company| {
                match record.hours_for(worker.id, company) {
                    hours if hours == 0.0 => String::new(),
                    hours => format_hours(hours),
                }
            }));
            row.push(format_hours(derived.worker_totals.get(index).copied().unwrap_or(0.0)));
            rows.push(row);
        }

        let mut footer = vec![String::new(), "Total".to_string()];
        footer.extend(derived.company_totals.iter().map(|total| format_hours(*total)));
        footer.push(format_hours(derived.grand_total));
        rows.push(footer);

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let widths = (0..columns)
            .map(|col| {
                rows.iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        Self { rows, widths }
    }

    fn line(&self, row: usize) -> String {
        let Some(cells) = self.rows.get(row) else {
            return String::new();
        };
        cells
            .iter()
            .zip(&self.widths)
            .enumerate()
            .map(|(col, (cell, &width))| {
                // Names are left-aligned, numbers right-aligned.
                if col == 1 {
                    format!("{cell:<width$}")
                } else {
                    format!("{cell:>width$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    }

    fn footer_index(&self) -> usize {
        self.rows.len() - 1
    }
}

pub fn table(record: &Record, derived: &Derived) -> String {
    let grid = Grid::build(record, derived);
    let mut out = String::new();
    for row in 0..grid.rows.len() {
        if row == grid.footer_index() {
            out.push_str(&rule(&grid));
            out.push('\n');
        }
        out.push_str(&grid.line(row));
        out.push('\n');
        if row == 0 {
            out.push_str(&rule(&grid));
            out.push('\n');
        }
    }
    out
}

fn rule(grid: &Grid) -> String {
    let width = grid.widths.iter().sum::<usize>() + 2 * grid.widths.len().saturating_sub(1);
    "-".repeat(width)
}

pub fn summary(record: &Record, derived: &Derived) -> String {
    let mut out = format!(
        "Month: {}\nTotal Fund: {CURRENCY}{}\nCompanies' Share:\n",
        record.month,
        format_amount(derived.total_fund)
    );
    for (company, name) in record.companies().iter().enumerate() {
        let share = derived.shares.get(company).copied().unwrap_or(0.0);
        let hours = derived.company_totals.get(company).copied().unwrap_or(0.0);
        out.push_str(&format!(
            "  {name}: {CURRENCY}{} ({} hrs)\n",
            format_amount(share),
            format_hours(hours)
        ));
    }
    out
}

/// Only what `change` can have affected.
pub fn region(change: Change, record: &Record, derived: &Derived) -> String {
    match change {
        Change::Structural | Change::Month | Change::CompanyName { .. } => {
            format!("{}\n{}", table(record, derived), summary(record, derived))
        }
        Change::HoursCell { worker, .. } => {
            let grid = Grid::build(record, derived);
            format!(
                "{}\n{}\n\n{}",
                grid.line(worker + 1),
                grid.line(grid.footer_index()),
                summary(record, derived)
            )
        }
        Change::WorkerName { worker } => {
            let grid = Grid::build(record, derived);
            format!("{}\n", grid.line(worker + 1))
        }
        Change::Rate => summary(record, derived),
    }
}
