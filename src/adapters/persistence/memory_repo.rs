//! In-memory data store. Implements every outbound port behind one RwLock.
//!
//! Used by tests and by `CHANTIER_STORE=memory` runs; nothing is persisted.

use crate::domain::{
    Avenant, ChangeEvent, Chantier, DomainError, Facture, NewNotification, Notification, Tache,
    TaskStatus,
};
use crate::ports::{BillingRepoPort, ChangeFeedPort, ChantierRepoPort, NotificationPort, TaskRepoPort};
use crate::shared::config::DEFAULT_FEED_CAPACITY;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

#[derive(Debug, Default)]
struct Tables {
    chantiers: BTreeMap<String, Chantier>,
    taches: BTreeMap<String, Tache>,
    avenants: Vec<Avenant>,
    factures: Vec<Facture>,
    notifications: Vec<Notification>,
    next_notification_id: i64,
}

/// Memory-backed store. Cheap to build; share via Arc.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    feed: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_feed_capacity(DEFAULT_FEED_CAPACITY)
    }

    pub fn with_feed_capacity(capacity: usize) -> Self {
        let (feed, _) = broadcast::channel(capacity.max(1));
        Self {
            tables: RwLock::new(Tables {
                next_notification_id: 1,
                ..Tables::default()
            }),
            feed,
        }
    }

    fn publish(&self, event: ChangeEvent) {
        // No subscriber is not an error.
        if self.feed.send(event).is_err() {
            debug!("change feed has no subscribers");
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ChantierRepoPort for MemoryStore {
    async fn list_chantiers(&self) -> Result<Vec<Chantier>, DomainError> {
        let tables = self.tables.read().await;
        let mut chantiers: Vec<Chantier> = tables.chantiers.values().cloned().collect();
        chantiers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(chantiers)
    }

    async fn get_chantier(&self, chantier_id: &str) -> Result<Option<Chantier>, DomainError> {
        Ok(self.tables.read().await.chantiers.get(chantier_id).cloned())
    }

    async fn save_chantier(&self, chantier: &Chantier) -> Result<(), DomainError> {
        self.tables
            .write()
            .await
            .chantiers
            .insert(chantier.id.clone(), chantier.clone());
        self.publish(ChangeEvent::ChantierChanged {
            chantier_id: chantier.id.clone(),
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl TaskRepoPort for MemoryStore {
    async fn list_tasks(&self, chantier_id: &str) -> Result<Vec<Tache>, DomainError> {
        Ok(self
            .tables
            .read()
            .await
            .taches
            .values()
            .filter(|t| t.chantier_id == chantier_id)
            .cloned()
            .collect())
    }

    async fn list_all_tasks(&self) -> Result<Vec<Tache>, DomainError> {
        Ok(self.tables.read().await.taches.values().cloned().collect())
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<Tache>, DomainError> {
        Ok(self.tables.read().await.taches.get(task_id).cloned())
    }

    async fn save_task(&self, task: &Tache) -> Result<(), DomainError> {
        self.tables
            .write()
            .await
            .taches
            .insert(task.id.clone(), task.clone());
        self.publish(ChangeEvent::TaskChanged {
            chantier_id: task.chantier_id.clone(),
            task_id: task.id.clone(),
        });
        Ok(())
    }

    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        updated_by: &str,
    ) -> Result<Tache, DomainError> {
        let updated = {
            let mut tables = self.tables.write().await;
            let task = tables
                .taches
                .get_mut(task_id)
                .ok_or_else(|| DomainError::not_found("task", task_id))?;
            task.status = status;
            task.updated_by = Some(updated_by.to_string());
            task.clone()
        };
        self.publish(ChangeEvent::TaskChanged {
            chantier_id: updated.chantier_id.clone(),
            task_id: updated.id.clone(),
        });
        Ok(updated)
    }
}

#[async_trait::async_trait]
impl BillingRepoPort for MemoryStore {
    async fn list_avenants(&self, chantier_id: &str) -> Result<Vec<Avenant>, DomainError> {
        Ok(self
            .tables
            .read()
            .await
            .avenants
            .iter()
            .filter(|a| a.chantier_id == chantier_id)
            .cloned()
            .collect())
    }

    async fn list_factures(&self, chantier_id: &str) -> Result<Vec<Facture>, DomainError> {
        Ok(self
            .tables
            .read()
            .await
            .factures
            .iter()
            .filter(|f| f.chantier_id == chantier_id)
            .cloned()
            .collect())
    }

    async fn save_avenant(&self, avenant: &Avenant) -> Result<(), DomainError> {
        {
            let mut tables = self.tables.write().await;
            tables.avenants.retain(|a| a.id != avenant.id);
            tables.avenants.push(avenant.clone());
        }
        self.publish(ChangeEvent::ChantierChanged {
            chantier_id: avenant.chantier_id.clone(),
        });
        Ok(())
    }

    async fn save_facture(&self, facture: &Facture) -> Result<(), DomainError> {
        {
            let mut tables = self.tables.write().await;
            tables.factures.retain(|f| f.id != facture.id);
            tables.factures.push(facture.clone());
        }
        self.publish(ChangeEvent::ChantierChanged {
            chantier_id: facture.chantier_id.clone(),
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationPort for MemoryStore {
    async fn push_notification(&self, n: &NewNotification) -> Result<Notification, DomainError> {
        let stored = {
            let mut tables = self.tables.write().await;
            let id = tables.next_notification_id;
            tables.next_notification_id += 1;
            let stored = Notification {
                id,
                user_id: n.user_id.clone(),
                chantier_id: n.chantier_id.clone(),
                message: n.message.clone(),
                created_at: Utc::now(),
                read: false,
            };
            tables.notifications.push(stored.clone());
            stored
        };
        self.publish(ChangeEvent::NotificationCreated {
            user_id: stored.user_id.clone(),
        });
        Ok(stored)
    }

    async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, DomainError> {
        let tables = self.tables.read().await;
        let mut list: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(list)
    }

    async fn mark_notifications_read(&self, user_id: &str) -> Result<usize, DomainError> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for n in tables
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            n.read = true;
            changed += 1;
        }
        Ok(changed)
    }
}

impl ChangeFeedPort for MemoryStore {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tache(id: &str, chantier_id: &str) -> Tache {
        Tache {
            id: id.to_string(),
            chantier_id: chantier_id.to_string(),
            title: "Plans d'exécution".to_string(),
            phase: "Études".to_string(),
            weight: 10.0,
            status: TaskStatus::NotStarted,
            start_date: None,
            end_date: None,
            updated_by: None,
        }
    }

    #[tokio::test]
    async fn test_update_status_publishes_event() {
        let store = MemoryStore::new();
        store.save_task(&tache("t1", "c1")).await.unwrap();
        let mut rx = store.subscribe();

        let updated = store
            .update_task_status("t1", TaskStatus::Done, "u1")
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.updated_by.as_deref(), Some("u1"));

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            ChangeEvent::TaskChanged {
                chantier_id: "c1".to_string(),
                task_id: "t1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_update_missing_task_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_task_status("nope", TaskStatus::Done, "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_notifications_newest_first() {
        let store = MemoryStore::new();
        for msg in ["a", "b"] {
            store
                .push_notification(&NewNotification {
                    user_id: "u1".to_string(),
                    chantier_id: None,
                    message: msg.to_string(),
                })
                .await
                .unwrap();
        }
        let list = store.list_notifications("u1").await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].message, "b");
        assert!(store.list_notifications("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_notifications_read() {
        let store = MemoryStore::new();
        for user in ["u1", "u1", "u2"] {
            store
                .push_notification(&NewNotification {
                    user_id: user.to_string(),
                    chantier_id: None,
                    message: "Tâche bloquée".to_string(),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.mark_notifications_read("u1").await.unwrap(), 2);
        assert_eq!(store.mark_notifications_read("u1").await.unwrap(), 0);
        assert!(store.list_notifications("u1").await.unwrap().iter().all(|n| n.read));
        assert!(!store.list_notifications("u2").await.unwrap()[0].read);
    }
}
