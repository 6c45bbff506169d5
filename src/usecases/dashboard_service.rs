//! Overview and portfolio dashboards: weighted progress per chantier and per phase.

use crate::domain::{
    Chantier, DomainError, PhaseProgress, Tache, TaskStatus, WeightedTask, compute_progress,
    compute_progress_by_phase,
};
use crate::ports::{ChantierRepoPort, TaskRepoPort};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// View-ready aggregate for one chantier.
#[derive(Debug, Clone, Serialize)]
pub struct ChantierOverview {
    pub chantier: Chantier,
    pub progress: u8,
    pub phases: BTreeMap<String, PhaseProgress>,
    pub task_count: usize,
    pub done_count: usize,
    pub blocked: Vec<Tache>,
}

impl ChantierOverview {
    /// Build from a chantier and its tasks. Pure.
    pub fn build(chantier: Chantier, tasks: &[Tache]) -> Self {
        let weighted: Vec<WeightedTask> = tasks.iter().map(WeightedTask::from).collect();
        Self {
            progress: compute_progress(&weighted),
            phases: compute_progress_by_phase(&weighted),
            task_count: tasks.len(),
            done_count: tasks.iter().filter(|t| t.status == TaskStatus::Done).count(),
            blocked: tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Blocked)
                .cloned()
                .collect(),
            chantier,
        }
    }
}

/// Every chantier plus the global score across all tasks.
#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub chantiers: Vec<ChantierOverview>,
    pub global_progress: u8,
}

pub struct DashboardService {
    chantiers: Arc<dyn ChantierRepoPort>,
    tasks: Arc<dyn TaskRepoPort>,
}

impl DashboardService {
    pub fn new(chantiers: Arc<dyn ChantierRepoPort>, tasks: Arc<dyn TaskRepoPort>) -> Self {
        Self { chantiers, tasks }
    }

    /// Fetch one chantier and its tasks, then score them.
    pub async fn chantier_overview(&self, chantier_id: &str) -> Result<ChantierOverview, DomainError> {
        let chantier = self
            .chantiers
            .get_chantier(chantier_id)
            .await?
            .ok_or_else(|| DomainError::not_found("chantier", chantier_id))?;
        let tasks = self.tasks.list_tasks(chantier_id).await?;
        let overview = ChantierOverview::build(chantier, &tasks);
        debug!(
            chantier_id,
            progress = overview.progress,
            tasks = overview.task_count,
            "overview computed"
        );
        Ok(overview)
    }

    /// All chantiers sorted by name. Two queries, grouped in memory.
    pub async fn portfolio(&self) -> Result<Portfolio, DomainError> {
        let mut chantiers = self.chantiers.list_chantiers().await?;
        chantiers.sort_by(|a, b| a.name.cmp(&b.name));
        let all_tasks = self.tasks.list_all_tasks().await?;

        let global: Vec<WeightedTask> = all_tasks.iter().map(WeightedTask::from).collect();
        let global_progress = compute_progress(&global);

        let mut by_chantier: HashMap<&str, Vec<Tache>> = HashMap::new();
        for task in &all_tasks {
            by_chantier
                .entry(task.chantier_id.as_str())
                .or_default()
                .push(task.clone());
        }

        let overviews = chantiers
            .into_iter()
            .map(|c| {
                let tasks = by_chantier.remove(c.id.as_str()).unwrap_or_default();
                ChantierOverview::build(c, &tasks)
            })
            .collect();

        Ok(Portfolio {
            chantiers: overviews,
            global_progress,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::domain::{Chantier, Tache, TaskStatus};
    use chrono::NaiveDate;

    pub fn chantier(id: &str, name: &str) -> Chantier {
        Chantier {
            id: id.to_string(),
            name: name.to_string(),
            client: None,
            responsible_id: Some(format!("resp-{}", id)),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date_planned: NaiveDate::from_ymd_opt(2024, 1, 28),
            estimated_hours: 80.0,
            budget: 100_000.0,
        }
    }

    pub fn tache(id: &str, chantier_id: &str, phase: &str, weight: f64, status: TaskStatus) -> Tache {
        Tache {
            id: id.to_string(),
            chantier_id: chantier_id.to_string(),
            title: format!("Tâche {}", id),
            phase: phase.to_string(),
            weight,
            status,
            start_date: None,
            end_date: None,
            updated_by: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{chantier, tache};
    use super::*;
    use crate::adapters::persistence::MemoryStore;

    async fn service() -> (Arc<MemoryStore>, DashboardService) {
        let store = Arc::new(MemoryStore::new());
        store.save_chantier(&chantier("c1", "Zénith")).await.unwrap();
        store.save_chantier(&chantier("c2", "Atelier")).await.unwrap();
        for t in [
            tache("t1", "c1", "Études", 10.0, TaskStatus::Done),
            tache("t2", "c1", "Études", 10.0, TaskStatus::NotStarted),
            tache("t3", "c1", "Exécution", 5.0, TaskStatus::Done),
            tache("t4", "c2", "Études", 20.0, TaskStatus::Blocked),
        ] {
            store.save_task(&t).await.unwrap();
        }
        let svc = DashboardService::new(
            Arc::clone(&store) as Arc<dyn ChantierRepoPort>,
            Arc::clone(&store) as Arc<dyn TaskRepoPort>,
        );
        (store, svc)
    }

    #[tokio::test]
    async fn test_chantier_overview() {
        let (_store, svc) = service().await;
        let overview = svc.chantier_overview("c1").await.unwrap();
        assert_eq!(overview.progress, 60);
        assert_eq!(overview.task_count, 3);
        assert_eq!(overview.done_count, 2);
        assert_eq!(overview.phases["Études"].score, 50);
        assert_eq!(overview.phases["Exécution"].score, 100);
        assert!(overview.blocked.is_empty());
    }

    #[tokio::test]
    async fn test_missing_chantier_is_not_found() {
        let (_store, svc) = service().await;
        let err = svc.chantier_overview("nope").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "chantier", .. }));
    }

    #[tokio::test]
    async fn test_portfolio_sorted_with_global_score() {
        let (_store, svc) = service().await;
        let portfolio = svc.portfolio().await.unwrap();
        let names: Vec<_> = portfolio.chantiers.iter().map(|o| o.chantier.name.as_str()).collect();
        assert_eq!(names, vec!["Atelier", "Zénith"]);
        // done 15 / total 45
        assert_eq!(portfolio.global_progress, 33);
        assert_eq!(portfolio.chantiers[0].blocked.len(), 1);
        assert_eq!(portfolio.chantiers[0].progress, 0);
    }

    #[tokio::test]
    async fn test_chantier_without_tasks_scores_zero() {
        let (store, svc) = service().await;
        store.save_chantier(&chantier("c3", "Bureaux")).await.unwrap();
        let overview = svc.chantier_overview("c3").await.unwrap();
        assert_eq!(overview.progress, 0);
        assert!(overview.phases.is_empty());
    }
}
