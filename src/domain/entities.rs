//! Domain entities. Pure data structures for the core business.
//!
//! No database/HTTP types here; adapters map rows into these.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A construction/engineering project. Root entity most other records reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chantier {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub client: Option<String>,
    /// User in charge of the chantier; receives its notifications.
    #[serde(default)]
    pub responsible_id: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date_planned: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_hours: f64,
    /// Initial contract budget, excluding tax.
    #[serde(default)]
    pub budget: f64,
}

impl Chantier {
    /// Schedule snapshot for the bucket allocator. None until both dates are set.
    pub fn schedule(&self) -> Option<ChantierSchedule> {
        Some(ChantierSchedule {
            start_date: self.start_date?,
            end_date_planned: self.end_date_planned?,
            estimated_hours: self.estimated_hours,
        })
    }
}

/// Task lifecycle. Only `Done` counts toward completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Done,
    Blocked,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Done,
        TaskStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
        }
    }

    /// Parse the stored column value. Unknown values read as `NotStarted`.
    pub fn from_db(s: &str) -> Self {
        match s {
            "in_progress" => TaskStatus::InProgress,
            "done" => TaskStatus::Done,
            "blocked" => TaskStatus::Blocked,
            _ => TaskStatus::NotStarted,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::NotStarted => "À faire",
            TaskStatus::InProgress => "En cours",
            TaskStatus::Done => "Terminé",
            TaskStatus::Blocked => "Bloqué",
        };
        f.write_str(label)
    }
}

/// A checklist/process item belonging to a chantier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tache {
    pub id: String,
    pub chantier_id: String,
    pub title: String,
    pub phase: String,
    /// "Poids": relative importance toward completion.
    pub weight: f64,
    pub status: TaskStatus,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Last writer, taken from the caller's `UserContext`.
    #[serde(default)]
    pub updated_by: Option<String>,
}

/// Input to the progress calculator.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTask {
    pub id: String,
    pub phase: String,
    pub weight: f64,
    pub status: TaskStatus,
}

impl From<&Tache> for WeightedTask {
    fn from(t: &Tache) -> Self {
        Self {
            id: t.id.clone(),
            phase: t.phase.clone(),
            weight: t.weight,
            status: t.status,
        }
    }
}

/// Input to the bucket allocator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChantierSchedule {
    pub start_date: NaiveDate,
    pub end_date_planned: NaiveDate,
    pub estimated_hours: f64,
}

/// Contract amendment affecting budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avenant {
    pub id: String,
    pub chantier_id: String,
    pub label: String,
    /// Amount excluding tax; negative for a reduction.
    pub amount: f64,
    #[serde(default)]
    pub signed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactureStatus {
    Draft,
    Sent,
    Paid,
}

impl FactureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactureStatus::Draft => "draft",
            FactureStatus::Sent => "sent",
            FactureStatus::Paid => "paid",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "sent" => FactureStatus::Sent,
            "paid" => FactureStatus::Paid,
            _ => FactureStatus::Draft,
        }
    }
}

/// Invoice issued against a chantier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facture {
    pub id: String,
    pub chantier_id: String,
    pub number: String,
    pub amount: f64,
    pub status: FactureStatus,
}

/// In-app notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: String,
    #[serde(default)]
    pub chantier_id: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// Notification before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNotification {
    pub user_id: String,
    pub chantier_id: Option<String>,
    pub message: String,
}

/// Identity of the caller. Passed explicitly to every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Row change published by a store after a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    ChantierChanged { chantier_id: String },
    TaskChanged { chantier_id: String, task_id: String },
    NotificationCreated { user_id: String },
}
