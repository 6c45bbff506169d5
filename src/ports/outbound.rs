//! Outbound ports. Application calls into the data store.
//!
//! Implemented by adapters (SQLite, Supabase PostgREST, in-memory).

use crate::domain::{
    Avenant, ChangeEvent, Chantier, DomainError, Facture, NewNotification, Notification, Tache,
    TaskStatus,
};
use tokio::sync::broadcast;

/// Chantier records.
#[async_trait::async_trait]
pub trait ChantierRepoPort: Send + Sync {
    /// All chantiers, ordered by name.
    async fn list_chantiers(&self) -> Result<Vec<Chantier>, DomainError>;

    /// Single chantier by id. `Ok(None)` when absent.
    async fn get_chantier(&self, chantier_id: &str) -> Result<Option<Chantier>, DomainError>;

    /// Insert or replace a chantier.
    async fn save_chantier(&self, chantier: &Chantier) -> Result<(), DomainError>;
}

/// Tasks (taches) of a chantier.
#[async_trait::async_trait]
pub trait TaskRepoPort: Send + Sync {
    async fn list_tasks(&self, chantier_id: &str) -> Result<Vec<Tache>, DomainError>;

    /// Every task of every chantier (global dashboard).
    async fn list_all_tasks(&self) -> Result<Vec<Tache>, DomainError>;

    async fn get_task(&self, task_id: &str) -> Result<Option<Tache>, DomainError>;

    /// Insert or replace a task.
    async fn save_task(&self, task: &Tache) -> Result<(), DomainError>;

    /// Update status and last writer. Returns the stored row.
    /// Fails with `DomainError::NotFound` when the task does not exist.
    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        updated_by: &str,
    ) -> Result<Tache, DomainError>;
}

/// Avenants and factures.
#[async_trait::async_trait]
pub trait BillingRepoPort: Send + Sync {
    async fn list_avenants(&self, chantier_id: &str) -> Result<Vec<Avenant>, DomainError>;

    async fn list_factures(&self, chantier_id: &str) -> Result<Vec<Facture>, DomainError>;

    /// Insert or replace an avenant.
    async fn save_avenant(&self, avenant: &Avenant) -> Result<(), DomainError>;

    /// Insert or replace a facture.
    async fn save_facture(&self, facture: &Facture) -> Result<(), DomainError>;
}

/// In-app notifications.
#[async_trait::async_trait]
pub trait NotificationPort: Send + Sync {
    /// Store a notification and return it with its assigned id.
    async fn push_notification(&self, n: &NewNotification) -> Result<Notification, DomainError>;

    /// Notifications addressed to `user_id`, newest first.
    async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, DomainError>;

    /// Mark every unread notification of `user_id` as read. Returns how many changed.
    async fn mark_notifications_read(&self, user_id: &str) -> Result<usize, DomainError>;
}

/// Change feed. Stores publish one event per successful mutation.
pub trait ChangeFeedPort: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}
