//! Weekly report service. Writes one Markdown "rapport hebdomadaire" per chantier.
//!
//! Coordinates the dashboard (progress), billing and planning data for the week.

use crate::domain::{
    BillingSummary, ChantierSchedule, DateRange, DomainError, allocate, bucket_offset_in_days,
    week_buckets, week_start,
};
use crate::ports::ChantierRepoPort;
use crate::usecases::billing_service::BillingService;
use crate::usecases::dashboard_service::{ChantierOverview, DashboardService};
use chrono::{Datelike, NaiveDate, Utc};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

/// Hours the flat allocation assigns to `week` when spread over every week
/// the schedule overlaps. 0 outside the schedule.
fn planned_hours_in_week(schedule: &ChantierSchedule, week: DateRange) -> f64 {
    if schedule.end_date_planned < schedule.start_date {
        return 0.0;
    }
    let first = week_start(schedule.start_date);
    let weeks = bucket_offset_in_days(schedule.end_date_planned, first) / 7 + 1;
    let buckets = week_buckets(first, weeks as usize);
    buckets
        .iter()
        .position(|b| *b == week)
        .and_then(|i| allocate(schedule, &buckets).get(&i).copied())
        .unwrap_or(0.0)
}

/// Keeps `[A-Za-z0-9_-]`, replaces anything else with `_`.
fn file_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Everything a weekly report shows for one chantier.
#[derive(Debug, Clone)]
pub struct WeeklyReport {
    pub week: DateRange,
    pub overview: ChantierOverview,
    pub billing: BillingSummary,
    /// Hours allocated to this week, None when the chantier has no schedule.
    pub planned_hours: Option<f64>,
}

impl WeeklyReport {
    /// ISO week label, e.g. "2024-W05".
    pub fn week_label(&self) -> String {
        let iso = self.week.start.iso_week();
        format!("{}-W{:02}", iso.year(), iso.week())
    }

    pub fn file_name(&self) -> String {
        format!(
            "rapport_{}_{}.md",
            file_component(&self.overview.chantier.id),
            self.week_label()
        )
    }

    /// Render Markdown. Pure.
    pub fn render(&self) -> String {
        let c = &self.overview.chantier;
        let mut md = String::new();

        let _ = writeln!(md, "# Rapport hebdomadaire : {}\n", c.name);
        let _ = writeln!(
            md,
            "**Semaine :** {} ({}) | **Généré :** {}\n",
            self.week_label(),
            self.week,
            Utc::now().format("%Y-%m-%d %H:%M UTC")
        );
        if let Some(client) = &c.client {
            let _ = writeln!(md, "**Client :** {}\n", client);
        }
        md.push_str("---\n\n");

        md.push_str("## Avancement\n\n");
        let _ = writeln!(
            md,
            "Avancement global pondéré : **{} %** ({}/{} tâches terminées)\n",
            self.overview.progress, self.overview.done_count, self.overview.task_count
        );
        if !self.overview.phases.is_empty() {
            md.push_str("| Phase | Score | Tâches |\n|---|---:|---:|\n");
            for (phase, p) in &self.overview.phases {
                let _ = writeln!(md, "| {} | {} % | {}/{} |", phase, p.score, p.done, p.total);
            }
            md.push('\n');
        }

        if !self.overview.blocked.is_empty() {
            md.push_str("## Points bloquants\n\n");
            for t in &self.overview.blocked {
                let _ = writeln!(md, "- **{}** ({})", t.title, t.phase);
            }
            md.push('\n');
        }

        md.push_str("## Charge prévue\n\n");
        match self.planned_hours {
            Some(h) => {
                let _ = writeln!(md, "{:.1} h planifiées sur la semaine\n", h);
            }
            None => md.push_str("Planning non renseigné\n\n"),
        }

        let b = &self.billing;
        md.push_str("## Facturation\n\n");
        let _ = writeln!(md, "- Budget initial : {:.2} € HT", b.initial_budget);
        let _ = writeln!(md, "- Avenants signés : {:.2} € HT", b.amendments_total);
        let _ = writeln!(md, "- Budget révisé : {:.2} € HT", b.revised_budget);
        let _ = writeln!(
            md,
            "- Facturé : {:.2} € HT ({} %)",
            b.invoiced_total, b.invoiced_percent
        );
        let _ = writeln!(md, "- Encaissé : {:.2} € HT", b.paid_total);
        let _ = writeln!(md, "- Reste à facturer : {:.2} € HT\n", b.remaining_to_invoice);

        md.push_str("---\n");
        md.push_str("*Généré par chantier-board*\n");
        md
    }
}

pub struct ReportService {
    chantiers: Arc<dyn ChantierRepoPort>,
    dashboard: Arc<DashboardService>,
    billing: Arc<BillingService>,
    reports_dir: PathBuf,
}

impl ReportService {
    pub fn new(
        chantiers: Arc<dyn ChantierRepoPort>,
        dashboard: Arc<DashboardService>,
        billing: Arc<BillingService>,
        reports_dir: PathBuf,
    ) -> Self {
        Self {
            chantiers,
            dashboard,
            billing,
            reports_dir,
        }
    }

    /// Collect report data for the week containing `week_of`.
    pub async fn build(
        &self,
        chantier_id: &str,
        week_of: NaiveDate,
    ) -> Result<WeeklyReport, DomainError> {
        let overview = self.dashboard.chantier_overview(chantier_id).await?;
        let billing = self.billing.summary(chantier_id).await?.summary;
        let week = week_buckets(week_of, 1)
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::Report(format!("no week for {}", week_of)))?;
        let planned_hours = overview
            .chantier
            .schedule()
            .map(|s| planned_hours_in_week(&s, week));
        Ok(WeeklyReport {
            week,
            overview,
            billing,
            planned_hours,
        })
    }

    /// Write the report for one chantier. Returns the file path.
    pub async fn write_report(
        &self,
        chantier_id: &str,
        week_of: NaiveDate,
    ) -> Result<PathBuf, DomainError> {
        fs::create_dir_all(&self.reports_dir)
            .await
            .map_err(|e| DomainError::Report(format!("Failed to create reports dir: {}", e)))?;

        let report = self.build(chantier_id, week_of).await?;
        let path = self.reports_dir.join(report.file_name());
        fs::write(&path, report.render())
            .await
            .map_err(|e| DomainError::Report(format!("Failed to write report: {}", e)))?;

        info!(path = %path.display(), chantier_id, "report generated");
        Ok(path)
    }

    /// Write reports for every chantier. A failing chantier is logged and skipped.
    pub async fn write_all(&self, week_of: NaiveDate) -> Result<Vec<PathBuf>, DomainError> {
        let chantiers = self.chantiers.list_chantiers().await?;
        let mut paths = Vec::new();
        for c in chantiers {
            match self.write_report(&c.id, week_of).await {
                Ok(path) => paths.push(path),
                Err(e) => warn!(chantier_id = %c.id, error = %e, "report skipped"),
            }
        }
        info!(reports_generated = paths.len(), "weekly reports complete");
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::MemoryStore;
    use crate::domain::TaskStatus;
    use crate::ports::{BillingRepoPort, TaskRepoPort};
    use crate::usecases::dashboard_service::fixtures::{chantier, tache};

    async fn service(dir: PathBuf) -> (Arc<MemoryStore>, ReportService) {
        let store = Arc::new(MemoryStore::new());
        store.save_chantier(&chantier("c1", "Crèche")).await.unwrap();
        store
            .save_task(&tache("t1", "c1", "Études", 40.0, TaskStatus::Done))
            .await
            .unwrap();
        store
            .save_task(&tache("t2", "c1", "Exécution", 60.0, TaskStatus::Blocked))
            .await
            .unwrap();
        let chantiers = Arc::clone(&store) as Arc<dyn ChantierRepoPort>;
        let dashboard = Arc::new(DashboardService::new(
            Arc::clone(&chantiers),
            Arc::clone(&store) as Arc<dyn TaskRepoPort>,
        ));
        let billing = Arc::new(BillingService::new(
            Arc::clone(&chantiers),
            Arc::clone(&store) as Arc<dyn BillingRepoPort>,
        ));
        (store, ReportService::new(chantiers, dashboard, billing, dir))
    }

    #[tokio::test]
    async fn test_build_report() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, svc) = service(dir.path().to_path_buf()).await;
        let report = svc
            .build("c1", NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(report.week_label(), "2024-W02");
        assert_eq!(report.planned_hours, Some(20.0));
        assert_eq!(report.file_name(), "rapport_c1_2024-W02.md");

        let md = report.render();
        assert!(md.contains("# Rapport hebdomadaire : Crèche"));
        assert!(md.contains("**40 %**"));
        assert!(md.contains("## Points bloquants"));
        assert!(md.contains("| Exécution | 0 % | 0/1 |"));
        assert!(md.contains("20.0 h planifiées"));
    }

    #[tokio::test]
    async fn test_planned_hours_partial_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let (store, svc) = service(dir.path().to_path_buf()).await;
        // Wednesday 2024-01-03 to Tuesday 2024-01-16 touches three weeks.
        let mut c = chantier("c3", "Médiathèque");
        c.start_date = NaiveDate::from_ymd_opt(2024, 1, 3);
        c.end_date_planned = NaiveDate::from_ymd_opt(2024, 1, 16);
        c.estimated_hours = 30.0;
        store.save_chantier(&c).await.unwrap();

        for (day, expected) in [(2, 10.0), (10, 10.0), (17, 10.0), (24, 0.0)] {
            let report = svc
                .build("c3", NaiveDate::from_ymd_opt(2024, 1, day).unwrap())
                .await
                .unwrap();
            assert_eq!(report.planned_hours, Some(expected), "week of 2024-01-{:02}", day);
        }
    }

    #[test]
    fn test_planned_hours_inverted_schedule_is_zero() {
        let schedule = ChantierSchedule {
            start_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            end_date_planned: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            estimated_hours: 50.0,
        };
        let week = week_buckets(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), 1)[0];
        assert_eq!(planned_hours_in_week(&schedule, week), 0.0);
    }

    #[test]
    fn test_file_component_strips_path_characters() {
        assert_eq!(file_component("../../etc/passwd"), "______etc_passwd");
        assert_eq!(file_component("chantier-42_B"), "chantier-42_B");
        assert_eq!(file_component("a b/é"), "a_b__");
    }

    #[tokio::test]
    async fn test_report_stays_in_reports_dir() {
        let dir = tempfile::tempdir().unwrap();
        let reports = dir.path().join("reports");
        let (store, svc) = service(reports.clone()).await;
        store
            .save_chantier(&chantier("../evil", "Hangar"))
            .await
            .unwrap();
        let path = svc
            .write_report("../evil", NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(path.parent(), Some(reports.as_path()));
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("rapport____evil_2024-W02.md")
        );
    }

    #[tokio::test]
    async fn test_write_all() {
        let dir = tempfile::tempdir().unwrap();
        let (store, svc) = service(dir.path().join("reports")).await;
        store.save_chantier(&chantier("c2", "Halle")).await.unwrap();
        let paths = svc
            .write_all(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(paths.len(), 2);
        for p in &paths {
            assert!(p.exists());
        }
        let content = std::fs::read_to_string(&paths[0]).unwrap();
        // Outside the schedule: 0 h this week.
        assert!(content.contains("0.0 h planifiées"));
    }
}
