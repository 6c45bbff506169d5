//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod billing;
pub mod buckets;
pub mod entities;
pub mod errors;
pub mod progress;

pub use billing::{BillingSummary, summarize_billing};
pub use buckets::{
    DateRange, GanttBar, Granularity, allocate, bucket_offset_in_days, gantt_bar, month_buckets,
    week_buckets, week_start,
};
pub use entities::{
    Avenant, ChangeEvent, Chantier, ChantierSchedule, Facture, FactureStatus, NewNotification,
    Notification, Tache, TaskStatus, UserContext, WeightedTask,
};
pub use errors::DomainError;
pub use progress::{PhaseProgress, compute_progress, compute_progress_by_phase};
