//! Task mutations: status changes and task creation.
//!
//! Every mutation takes an explicit `UserContext`, writes through the port,
//! then re-fetches the chantier overview so the caller renders fresh data.

use crate::domain::{DomainError, NewNotification, Tache, TaskStatus, UserContext};
use crate::ports::{ChantierRepoPort, NotificationPort, TaskRepoPort};
use crate::usecases::dashboard_service::{ChantierOverview, DashboardService};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

/// Task creation form.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub chantier_id: String,
    pub title: String,
    pub phase: String,
    pub weight: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Reject what the calculator would otherwise silently clamp.
pub fn validate_new_task(task: &NewTask) -> Result<(), DomainError> {
    if task.title.trim().is_empty() {
        return Err(DomainError::Validation("title is empty".to_string()));
    }
    if task.phase.trim().is_empty() {
        return Err(DomainError::Validation("phase is empty".to_string()));
    }
    if !task.weight.is_finite() || task.weight < 0.0 {
        return Err(DomainError::Validation(format!(
            "weight must be a non-negative number, got {}",
            task.weight
        )));
    }
    if let (Some(start), Some(end)) = (task.start_date, task.end_date) {
        if end < start {
            return Err(DomainError::Validation(format!(
                "end date {} is before start date {}",
                end, start
            )));
        }
    }
    Ok(())
}

pub struct TaskService {
    chantiers: Arc<dyn ChantierRepoPort>,
    tasks: Arc<dyn TaskRepoPort>,
    notifications: Arc<dyn NotificationPort>,
    dashboard: Arc<DashboardService>,
}

impl TaskService {
    pub fn new(
        chantiers: Arc<dyn ChantierRepoPort>,
        tasks: Arc<dyn TaskRepoPort>,
        notifications: Arc<dyn NotificationPort>,
        dashboard: Arc<DashboardService>,
    ) -> Self {
        Self {
            chantiers,
            tasks,
            notifications,
            dashboard,
        }
    }

    pub async fn list_tasks(&self, chantier_id: &str) -> Result<Vec<Tache>, DomainError> {
        self.tasks.list_tasks(chantier_id).await
    }

    /// Change a task's status. When the task becomes blocked, the chantier
    /// responsible is notified (unless they made the change themselves).
    pub async fn set_status(
        &self,
        ctx: &UserContext,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<ChantierOverview, DomainError> {
        let previous = self
            .tasks
            .get_task(task_id)
            .await?
            .ok_or_else(|| DomainError::not_found("task", task_id))?;

        let updated = self
            .tasks
            .update_task_status(task_id, status, &ctx.user_id)
            .await?;
        info!(
            task_id,
            chantier_id = %updated.chantier_id,
            from = previous.status.as_str(),
            to = status.as_str(),
            user_id = %ctx.user_id,
            "task status updated"
        );

        if status == TaskStatus::Blocked && previous.status != TaskStatus::Blocked {
            if let Err(e) = self.notify_blocked(ctx, &updated).await {
                // Status write is already committed.
                warn!(task_id, error = %e, "failed to notify blocked task");
            }
        }

        self.dashboard.chantier_overview(&updated.chantier_id).await
    }

    /// Create a task after validation. Returns the stored task.
    pub async fn add_task(&self, ctx: &UserContext, new: NewTask) -> Result<Tache, DomainError> {
        validate_new_task(&new)?;
        if self.chantiers.get_chantier(&new.chantier_id).await?.is_none() {
            return Err(DomainError::not_found("chantier", new.chantier_id));
        }

        let task = Tache {
            id: uuid::Uuid::new_v4().to_string(),
            chantier_id: new.chantier_id,
            title: new.title.trim().to_string(),
            phase: new.phase.trim().to_string(),
            weight: new.weight,
            status: TaskStatus::NotStarted,
            start_date: new.start_date,
            end_date: new.end_date,
            updated_by: Some(ctx.user_id.clone()),
        };
        self.tasks.save_task(&task).await?;
        info!(
            task_id = %task.id,
            chantier_id = %task.chantier_id,
            weight = task.weight,
            "task created"
        );
        Ok(task)
    }

    async fn notify_blocked(&self, ctx: &UserContext, task: &Tache) -> Result<(), DomainError> {
        let Some(chantier) = self.chantiers.get_chantier(&task.chantier_id).await? else {
            return Ok(());
        };
        let Some(responsible) = chantier.responsible_id else {
            return Ok(());
        };
        if responsible == ctx.user_id {
            return Ok(());
        }
        self.notifications
            .push_notification(&NewNotification {
                user_id: responsible,
                chantier_id: Some(chantier.id),
                message: format!(
                    "Tâche bloquée sur {} : {} ({})",
                    chantier.name, task.title, task.phase
                ),
            })
            .await?;
        Ok(())
    }
}
