//! Planning: workload table (plan de charge) and Gantt bars.

use crate::domain::{
    Chantier, DateRange, DomainError, GanttBar, Granularity, Tache, allocate, gantt_bar,
};
use crate::ports::{ChantierRepoPort, TaskRepoPort};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Hours allocated to one chantier, keyed by bucket index.
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadRow {
    pub chantier_id: String,
    pub name: String,
    pub hours: BTreeMap<usize, f64>,
}

impl WorkloadRow {
    pub fn total(&self) -> f64 {
        self.hours.values().sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkloadTable {
    pub buckets: Vec<DateRange>,
    pub rows: Vec<WorkloadRow>,
    /// Sum over rows, one entry per bucket.
    pub totals: Vec<f64>,
}

/// Pure table builder. Chantiers without both dates, or outside every bucket, get no row.
pub fn build_workload(chantiers: &[Chantier], buckets: Vec<DateRange>) -> WorkloadTable {
    let mut totals = vec![0.0; buckets.len()];
    let mut rows = Vec::new();

    for c in chantiers {
        let Some(schedule) = c.schedule() else {
            debug!(chantier_id = %c.id, "no schedule; skipped from workload");
            continue;
        };
        if schedule.end_date_planned < schedule.start_date {
            warn!(
                chantier_id = %c.id,
                start = %schedule.start_date,
                end = %schedule.end_date_planned,
                "planned end before start; allocating 0 h"
            );
        }
        let hours = allocate(&schedule, &buckets);
        if hours.is_empty() {
            continue;
        }
        for (&i, h) in &hours {
            totals[i] += h;
        }
        rows.push(WorkloadRow {
            chantier_id: c.id.clone(),
            name: c.name.clone(),
            hours,
        });
    }

    WorkloadTable {
        buckets,
        rows,
        totals,
    }
}

/// One Gantt line.
#[derive(Debug, Clone, Serialize)]
pub struct GanttRow {
    pub id: String,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bar: GanttBar,
}

/// Gantt timeline: bars positioned against `reference_start`.
#[derive(Debug, Clone, Serialize)]
pub struct GanttChart {
    pub reference_start: NaiveDate,
    pub rows: Vec<GanttRow>,
}

impl GanttChart {
    /// Days from the reference to the end of the furthest bar.
    pub fn span_days(&self) -> i64 {
        self.rows
            .iter()
            .map(|r| r.bar.offset_days + r.bar.width_days)
            .max()
            .unwrap_or(0)
    }
}

fn build_gantt<I>(items: I, reference_start: Option<NaiveDate>) -> Option<GanttChart>
where
    I: IntoIterator<Item = (String, String, NaiveDate, NaiveDate)>,
{
    let items: Vec<_> = items.into_iter().collect();
    let reference_start = reference_start.or_else(|| items.iter().map(|i| i.2).min())?;
    let rows = items
        .into_iter()
        .map(|(id, label, start, end)| GanttRow {
            bar: gantt_bar(start, end, reference_start),
            id,
            label,
            start,
            end,
        })
        .collect();
    Some(GanttChart {
        reference_start,
        rows,
    })
}

pub struct PlanningService {
    chantiers: Arc<dyn ChantierRepoPort>,
    tasks: Arc<dyn TaskRepoPort>,
}

impl PlanningService {
    pub fn new(chantiers: Arc<dyn ChantierRepoPort>, tasks: Arc<dyn TaskRepoPort>) -> Self {
        Self { chantiers, tasks }
    }

    /// Workload over `count` buckets starting at the one containing `from`.
    pub async fn workload(
        &self,
        granularity: Granularity,
        from: NaiveDate,
        count: usize,
    ) -> Result<WorkloadTable, DomainError> {
        let chantiers = self.chantiers.list_chantiers().await?;
        Ok(build_workload(&chantiers, granularity.buckets(from, count)))
    }

    /// One bar per scheduled chantier. Reference defaults to the earliest start.
    /// `None` when no chantier has both dates.
    pub async fn gantt(
        &self,
        reference_start: Option<NaiveDate>,
    ) -> Result<Option<GanttChart>, DomainError> {
        let chantiers = self.chantiers.list_chantiers().await?;
        let items = chantiers.into_iter().filter_map(|c| {
            let (start, end) = (c.start_date?, c.end_date_planned?);
            Some((c.id, c.name, start, end))
        });
        Ok(build_gantt(items, reference_start))
    }

    /// One bar per dated task of a chantier, referenced on the chantier start.
    pub async fn task_gantt(&self, chantier_id: &str) -> Result<Option<GanttChart>, DomainError> {
        let chantier = self
            .chantiers
            .get_chantier(chantier_id)
            .await?
            .ok_or_else(|| DomainError::not_found("chantier", chantier_id))?;
        let mut tasks: Vec<Tache> = self.tasks.list_tasks(chantier_id).await?;
        tasks.sort_by_key(|t| t.start_date);
        let items = tasks.into_iter().filter_map(|t| {
            let (start, end) = (t.start_date?, t.end_date?);
            Some((t.id, format!("{} · {}", t.phase, t.title), start, end))
        });
        Ok(build_gantt(items, chantier.start_date))
    }
}
