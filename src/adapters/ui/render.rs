//! Plain-text renderers for the terminal dashboard. Pure: data in, String out.

use crate::domain::{Notification, TaskStatus};
use crate::usecases::{ChantierBilling, GanttChart, Portfolio, WorkloadTable};
use std::fmt::Write as _;

const NAME_WIDTH: usize = 28;

/// Truncate to `max` chars, padding to exactly `max`.
fn fit(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        format!("{}{}", text, " ".repeat(max - count))
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// Textual bar of `width` cells for a 0..=100 score.
pub fn score_bar(score: u8, width: usize) -> String {
    let filled = (usize::from(score.min(100)) * width + 50) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub fn render_portfolio(p: &Portfolio) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Avancement global : {} %\n", p.global_progress);
    for o in &p.chantiers {
        let blocked = if o.blocked.is_empty() {
            String::new()
        } else {
            format!("  ⚠ {} bloquée(s)", o.blocked.len())
        };
        let _ = writeln!(
            out,
            "{} {} {:>3} %  {}/{}{}",
            fit(&o.chantier.name, NAME_WIDTH),
            score_bar(o.progress, 20),
            o.progress,
            o.done_count,
            o.task_count,
            blocked
        );
    }
    if p.chantiers.is_empty() {
        out.push_str("Aucun chantier\n");
    }
    out
}

/// Workload table: one column per bucket, hours rounded to the unit.
pub fn render_workload(table: &WorkloadTable) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}", fit("Chantier", NAME_WIDTH));
    for b in &table.buckets {
        let _ = write!(out, " {:>6}", b.start.format("%d/%m"));
    }
    out.push_str("   Total\n");

    for row in &table.rows {
        let _ = write!(out, "{}", fit(&row.name, NAME_WIDTH));
        for i in 0..table.buckets.len() {
            match row.hours.get(&i) {
                Some(h) => {
                    let _ = write!(out, " {:>6.0}", h);
                }
                None => {
                    let _ = write!(out, " {:>6}", "·");
                }
            }
        }
        let _ = writeln!(out, " {:>7.0}", row.total());
    }

    let _ = write!(out, "{}", fit("Total (h)", NAME_WIDTH));
    for t in &table.totals {
        let _ = write!(out, " {:>6.0}", t);
    }
    let _ = writeln!(out, " {:>7.0}", table.totals.iter().sum::<f64>());
    out
}

/// Gantt chart scaled to `width` columns.
pub fn render_gantt(chart: &GanttChart, width: usize) -> String {
    let mut out = String::new();
    let span = chart.span_days().max(1);
    let width = width.max(1) as i64;
    let _ = writeln!(
        out,
        "Référence : {} ({} jours)",
        chart.reference_start.format("%d/%m/%Y"),
        span
    );
    for row in &chart.rows {
        let offset = (row.bar.offset_days.max(0) * width / span).min(width);
        let len = if row.bar.width_days > 0 {
            (row.bar.width_days * width / span).max(1)
        } else {
            0
        };
        let len = len.min(width - offset);
        let _ = writeln!(
            out,
            "{} |{}{}{}| {} → {}",
            fit(&row.label, NAME_WIDTH),
            " ".repeat(offset as usize),
            "█".repeat(len as usize),
            " ".repeat((width - offset - len) as usize),
            row.start.format("%d/%m"),
            row.end.format("%d/%m")
        );
    }
    out
}

pub fn render_billing(b: &ChantierBilling) -> String {
    let s = &b.summary;
    let mut out = String::new();
    let _ = writeln!(out, "{}", b.chantier.name);
    let _ = writeln!(out, "  Budget initial      {:>14.2} € HT", s.initial_budget);
    let _ = writeln!(out, "  Avenants signés     {:>14.2} € HT", s.amendments_total);
    let _ = writeln!(out, "  Budget révisé       {:>14.2} € HT", s.revised_budget);
    let _ = writeln!(
        out,
        "  Facturé             {:>14.2} € HT  ({} %)",
        s.invoiced_total, s.invoiced_percent
    );
    let _ = writeln!(out, "  Encaissé            {:>14.2} € HT", s.paid_total);
    let _ = writeln!(out, "  Reste à facturer    {:>14.2} € HT", s.remaining_to_invoice);
    if !b.factures.is_empty() {
        out.push_str("\n  Factures :\n");
        for f in &b.factures {
            let _ = writeln!(
                out,
                "    {:<14} {:>12.2} €  {}",
                f.number,
                f.amount,
                f.status.as_str()
            );
        }
    }
    out
}

pub fn render_notifications(list: &[Notification]) -> String {
    if list.is_empty() {
        return "Aucune notification\n".to_string();
    }
    let mut out = String::new();
    for n in list {
        let marker = if n.read { " " } else { "●" };
        let _ = writeln!(
            out,
            "{} {}  {}",
            marker,
            n.created_at.format("%d/%m %H:%M"),
            n.message
        );
    }
    out
}

/// Short status tag for task lists.
pub fn status_tag(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::NotStarted => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Done => "[x]",
        TaskStatus::Blocked => "[!]",
    }
}
