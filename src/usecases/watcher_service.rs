//! Watcher use case: follow the change feed and react to task changes.
//!
//! Recomputes the chantier score after each task change and sends one
//! "chantier terminé" notification to the responsible the first time it reaches 100 %.

use crate::domain::{ChangeEvent, DomainError, NewNotification};
use crate::ports::NotificationPort;
use crate::usecases::dashboard_service::DashboardService;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{info, warn};

pub struct WatcherService {
    dashboard: Arc<DashboardService>,
    notifications: Arc<dyn NotificationPort>,
    /// Chantiers already announced as complete.
    completed: Mutex<HashSet<String>>,
}

impl WatcherService {
    pub fn new(dashboard: Arc<DashboardService>, notifications: Arc<dyn NotificationPort>) -> Self {
        Self {
            dashboard,
            notifications,
            completed: Mutex::new(HashSet::new()),
        }
    }

    /// Consume events until the feed closes. Per-event failures are logged, not fatal.
    pub async fn run(&self, mut feed: broadcast::Receiver<ChangeEvent>) -> Result<(), DomainError> {
        info!("watcher started");
        loop {
            match feed.recv().await {
                Ok(ChangeEvent::TaskChanged {
                    chantier_id,
                    task_id,
                }) => {
                    if let Err(e) = self.on_task_changed(&chantier_id).await {
                        warn!(chantier_id = %chantier_id, task_id = %task_id, error = %e, "watcher refresh failed");
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "watcher lagged behind the change feed");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("change feed closed; watcher stopped");
                    return Ok(());
                }
            }
        }
    }

    /// Returns the fresh score for `chantier_id`.
    pub async fn on_task_changed(&self, chantier_id: &str) -> Result<u8, DomainError> {
        let overview = self.dashboard.chantier_overview(chantier_id).await?;
        info!(
            chantier_id,
            progress = overview.progress,
            blocked = overview.blocked.len(),
            "chantier progress refreshed"
        );

        if overview.progress < 100 {
            return Ok(overview.progress);
        }
        if self.completed.lock().await.contains(chantier_id) {
            return Ok(overview.progress);
        }
        if let Some(responsible) = overview.chantier.responsible_id.clone() {
            self.notifications
                .push_notification(&NewNotification {
                    user_id: responsible,
                    chantier_id: Some(chantier_id.to_string()),
                    message: format!("Chantier terminé : {} (100 %)", overview.chantier.name),
                })
                .await?;
            info!(chantier_id, "completion notification sent");
        }
        // Record only after a successful push.
        self.completed.lock().await.insert(chantier_id.to_string());
        Ok(overview.progress)
    }
}
