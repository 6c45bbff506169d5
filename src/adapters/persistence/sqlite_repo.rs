//! SQLite-backed data store via libsql. Local mirror of the hosted BaaS tables.
//!
//! One database file (chantier.db) in the data directory holds chantiers, taches,
//! avenants, factures and notifications. Dates are stored as ISO `YYYY-MM-DD` text.
//! Every successful mutation is published on the change feed.

use crate::domain::{
    Avenant, ChangeEvent, Chantier, DomainError, Facture, FactureStatus, NewNotification,
    Notification, Tache, TaskStatus,
};
use crate::ports::{BillingRepoPort, ChangeFeedPort, ChantierRepoPort, NotificationPort, TaskRepoPort};
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database, Row, params};
use std::path::Path;
use tokio::sync::broadcast;
use tracing::{debug, info};

const CHANTIERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS chantiers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    client TEXT,
    responsible_id TEXT,
    start_date TEXT,
    end_date_planned TEXT,
    estimated_hours REAL NOT NULL DEFAULT 0,
    budget REAL NOT NULL DEFAULT 0
)"#;

const TACHES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS taches (
    id TEXT PRIMARY KEY,
    chantier_id TEXT NOT NULL,
    title TEXT NOT NULL,
    phase TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'not_started',
    start_date TEXT,
    end_date TEXT,
    updated_by TEXT
)"#;
const TACHES_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_taches_chantier ON taches (chantier_id, phase)";

const AVENANTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS avenants (
    id TEXT PRIMARY KEY,
    chantier_id TEXT NOT NULL,
    label TEXT NOT NULL,
    amount REAL NOT NULL,
    signed INTEGER NOT NULL DEFAULT 0
)"#;

const FACTURES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS factures (
    id TEXT PRIMARY KEY,
    chantier_id TEXT NOT NULL,
    number TEXT NOT NULL,
    amount REAL NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft'
)"#;

const NOTIFICATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    chantier_id TEXT,
    message TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    read INTEGER NOT NULL DEFAULT 0
)"#;

const CHANTIER_COLUMNS: &str =
    "id, name, client, responsible_id, start_date, end_date_planned, estimated_hours, budget";
const TACHE_COLUMNS: &str =
    "id, chantier_id, title, phase, weight, status, start_date, end_date, updated_by";

fn store_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Store(e.to_string())
}

fn date_to_db(d: Option<NaiveDate>) -> Option<String> {
    d.map(|d| d.format("%Y-%m-%d").to_string())
}

fn date_from_db(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

/// SQLite store. Safe to share via Arc; each call opens a fresh connection.
pub struct SqliteStore {
    db: Database,
    feed: broadcast::Sender<ChangeEvent>,
}

impl SqliteStore {
    /// Connect to (or create) the database and ensure the schema exists.
    /// Call once at startup.
    ///
    /// Sets WAL mode and synchronous=NORMAL so the watcher can read while the UI writes.
    pub async fn connect(
        base_dir: impl AsRef<Path>,
        feed_capacity: usize,
    ) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(store_err)?;
        let db_path = base.join("chantier.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(store_err)?;
        let conn = db.connect().map_err(store_err)?;

        // PRAGMA returns a row; consume it (execute fails when rows are returned).
        for pragma in ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL"] {
            let mut rows = conn
                .query(pragma, ())
                .await
                .map_err(|e| DomainError::Store(format!("{} failed: {}", pragma, e)))?;
            while rows.next().await.map_err(store_err)?.is_some() {}
        }

        for ddl in [
            CHANTIERS_TABLE,
            TACHES_TABLE,
            TACHES_INDEX,
            AVENANTS_TABLE,
            FACTURES_TABLE,
            NOTIFICATIONS_TABLE,
        ] {
            conn.execute(ddl, ()).await.map_err(store_err)?;
        }

        info!(path = %db_path.display(), "SQLite store connected with WAL mode");

        let (feed, _) = broadcast::channel(feed_capacity.max(1));
        Ok(Self { db, feed })
    }

    fn conn(&self) -> Result<Connection, DomainError> {
        self.db.connect().map_err(store_err)
    }

    fn publish(&self, event: ChangeEvent) {
        if self.feed.send(event).is_err() {
            debug!("change feed has no subscribers");
        }
    }

    fn row_to_chantier(row: &Row) -> Result<Chantier, DomainError> {
        Ok(Chantier {
            id: row.get(0).map_err(store_err)?,
            name: row.get(1).map_err(store_err)?,
            client: row.get::<String>(2).ok(),
            responsible_id: row.get::<String>(3).ok(),
            start_date: date_from_db(row.get::<String>(4).ok()),
            end_date_planned: date_from_db(row.get::<String>(5).ok()),
            estimated_hours: row.get::<f64>(6).unwrap_or_default(),
            budget: row.get::<f64>(7).unwrap_or_default(),
        })
    }

    fn row_to_tache(row: &Row) -> Result<Tache, DomainError> {
        let status: String = row.get(5).map_err(store_err)?;
        Ok(Tache {
            id: row.get(0).map_err(store_err)?,
            chantier_id: row.get(1).map_err(store_err)?,
            title: row.get(2).map_err(store_err)?,
            phase: row.get(3).map_err(store_err)?,
            weight: row.get::<f64>(4).unwrap_or_default(),
            status: TaskStatus::from_db(&status),
            start_date: date_from_db(row.get::<String>(6).ok()),
            end_date: date_from_db(row.get::<String>(7).ok()),
            updated_by: row.get::<String>(8).ok(),
        })
    }

    async fn query_taches(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Tache>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn.query(sql, params).await.map_err(store_err)?;
        let mut taches = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            taches.push(Self::row_to_tache(&row)?);
        }
        Ok(taches)
    }
}

#[async_trait::async_trait]
impl ChantierRepoPort for SqliteStore {
    async fn list_chantiers(&self) -> Result<Vec<Chantier>, DomainError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM chantiers ORDER BY name", CHANTIER_COLUMNS);
        let mut rows = conn.query(&sql, ()).await.map_err(store_err)?;
        let mut chantiers = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            chantiers.push(Self::row_to_chantier(&row)?);
        }
        Ok(chantiers)
    }

    async fn get_chantier(&self, chantier_id: &str) -> Result<Option<Chantier>, DomainError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM chantiers WHERE id = ?1", CHANTIER_COLUMNS);
        let mut rows = conn
            .query(&sql, params![chantier_id])
            .await
            .map_err(store_err)?;
        match rows.next().await.map_err(store_err)? {
            Some(row) => Ok(Some(Self::row_to_chantier(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_chantier(&self, c: &Chantier) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO chantiers (id, name, client, responsible_id, start_date, end_date_planned, estimated_hours, budget)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                client = excluded.client,
                responsible_id = excluded.responsible_id,
                start_date = excluded.start_date,
                end_date_planned = excluded.end_date_planned,
                estimated_hours = excluded.estimated_hours,
                budget = excluded.budget
            "#,
            params![
                c.id.as_str(),
                c.name.as_str(),
                c.client.clone(),
                c.responsible_id.clone(),
                date_to_db(c.start_date),
                date_to_db(c.end_date_planned),
                c.estimated_hours,
                c.budget
            ],
        )
        .await
        .map_err(store_err)?;
        self.publish(ChangeEvent::ChantierChanged {
            chantier_id: c.id.clone(),
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl TaskRepoPort for SqliteStore {
    async fn list_tasks(&self, chantier_id: &str) -> Result<Vec<Tache>, DomainError> {
        let sql = format!(
            "SELECT {} FROM taches WHERE chantier_id = ?1 ORDER BY phase, id",
            TACHE_COLUMNS
        );
        self.query_taches(&sql, params![chantier_id]).await
    }

    async fn list_all_tasks(&self) -> Result<Vec<Tache>, DomainError> {
        let sql = format!(
            "SELECT {} FROM taches ORDER BY chantier_id, phase, id",
            TACHE_COLUMNS
        );
        self.query_taches(&sql, ()).await
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<Tache>, DomainError> {
        let sql = format!("SELECT {} FROM taches WHERE id = ?1", TACHE_COLUMNS);
        Ok(self
            .query_taches(&sql, params![task_id])
            .await?
            .into_iter()
            .next())
    }

    async fn save_task(&self, t: &Tache) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO taches (id, chantier_id, title, phase, weight, status, start_date, end_date, updated_by)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT (id) DO UPDATE SET
                chantier_id = excluded.chantier_id,
                title = excluded.title,
                phase = excluded.phase,
                weight = excluded.weight,
                status = excluded.status,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                updated_by = excluded.updated_by
            "#,
            params![
                t.id.as_str(),
                t.chantier_id.as_str(),
                t.title.as_str(),
                t.phase.as_str(),
                t.weight,
                t.status.as_str(),
                date_to_db(t.start_date),
                date_to_db(t.end_date),
                t.updated_by.clone()
            ],
        )
        .await
        .map_err(store_err)?;
        self.publish(ChangeEvent::TaskChanged {
            chantier_id: t.chantier_id.clone(),
            task_id: t.id.clone(),
        });
        Ok(())
    }

    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        updated_by: &str,
    ) -> Result<Tache, DomainError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE taches SET status = ?1, updated_by = ?2 WHERE id = ?3",
                params![status.as_str(), updated_by, task_id],
            )
            .await
            .map_err(store_err)?;
        if changed == 0 {
            return Err(DomainError::not_found("task", task_id));
        }
        let task = self
            .get_task(task_id)
            .await?
            .ok_or_else(|| DomainError::not_found("task", task_id))?;
        self.publish(ChangeEvent::TaskChanged {
            chantier_id: task.chantier_id.clone(),
            task_id: task.id.clone(),
        });
        Ok(task)
    }
}

#[async_trait::async_trait]
impl BillingRepoPort for SqliteStore {
    async fn list_avenants(&self, chantier_id: &str) -> Result<Vec<Avenant>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT id, chantier_id, label, amount, signed FROM avenants WHERE chantier_id = ?1 ORDER BY id",
                params![chantier_id],
            )
            .await
            .map_err(store_err)?;
        let mut avenants = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            avenants.push(Avenant {
                id: row.get(0).map_err(store_err)?,
                chantier_id: row.get(1).map_err(store_err)?,
                label: row.get(2).map_err(store_err)?,
                amount: row.get::<f64>(3).unwrap_or_default(),
                signed: row.get::<i64>(4).unwrap_or_default() != 0,
            });
        }
        Ok(avenants)
    }

    async fn list_factures(&self, chantier_id: &str) -> Result<Vec<Facture>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT id, chantier_id, number, amount, status FROM factures WHERE chantier_id = ?1 ORDER BY number",
                params![chantier_id],
            )
            .await
            .map_err(store_err)?;
        let mut factures = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            let status: String = row.get(4).map_err(store_err)?;
            factures.push(Facture {
                id: row.get(0).map_err(store_err)?,
                chantier_id: row.get(1).map_err(store_err)?,
                number: row.get(2).map_err(store_err)?,
                amount: row.get::<f64>(3).unwrap_or_default(),
                status: FactureStatus::from_db(&status),
            });
        }
        Ok(factures)
    }

    async fn save_avenant(&self, a: &Avenant) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO avenants (id, chantier_id, label, amount, signed)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (id) DO UPDATE SET
                chantier_id = excluded.chantier_id,
                label = excluded.label,
                amount = excluded.amount,
                signed = excluded.signed
            "#,
            params![
                a.id.as_str(),
                a.chantier_id.as_str(),
                a.label.as_str(),
                a.amount,
                i64::from(a.signed)
            ],
        )
        .await
        .map_err(store_err)?;
        self.publish(ChangeEvent::ChantierChanged {
            chantier_id: a.chantier_id.clone(),
        });
        Ok(())
    }

    async fn save_facture(&self, f: &Facture) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO factures (id, chantier_id, number, amount, status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (id) DO UPDATE SET
                chantier_id = excluded.chantier_id,
                number = excluded.number,
                amount = excluded.amount,
                status = excluded.status
            "#,
            params![
                f.id.as_str(),
                f.chantier_id.as_str(),
                f.number.as_str(),
                f.amount,
                f.status.as_str()
            ],
        )
        .await
        .map_err(store_err)?;
        self.publish(ChangeEvent::ChantierChanged {
            chantier_id: f.chantier_id.clone(),
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationPort for SqliteStore {
    async fn push_notification(&self, n: &NewNotification) -> Result<Notification, DomainError> {
        let conn = self.conn()?;
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO notifications (user_id, chantier_id, message, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                n.user_id.as_str(),
                n.chantier_id.clone(),
                n.message.as_str(),
                created_at.timestamp()
            ],
        )
        .await
        .map_err(store_err)?;
        let id = conn.last_insert_rowid();
        self.publish(ChangeEvent::NotificationCreated {
            user_id: n.user_id.clone(),
        });
        Ok(Notification {
            id,
            user_id: n.user_id.clone(),
            chantier_id: n.chantier_id.clone(),
            message: n.message.clone(),
            created_at,
            read: false,
        })
    }

    async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT id, user_id, chantier_id, message, created_at, read
                FROM notifications
                WHERE user_id = ?1
                ORDER BY id DESC
                "#,
                params![user_id],
            )
            .await
            .map_err(store_err)?;
        let mut list = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            let secs: i64 = row.get(4).map_err(store_err)?;
            list.push(Notification {
                id: row.get(0).map_err(store_err)?,
                user_id: row.get(1).map_err(store_err)?,
                chantier_id: row.get::<String>(2).ok(),
                message: row.get(3).map_err(store_err)?,
                created_at: DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default(),
                read: row.get::<i64>(5).unwrap_or_default() != 0,
            });
        }
        Ok(list)
    }

    async fn mark_notifications_read(&self, user_id: &str) -> Result<usize, DomainError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                params![user_id],
            )
            .await
            .map_err(store_err)?;
        Ok(changed as usize)
    }
}

impl ChangeFeedPort for SqliteStore {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}
