//! Application use cases. Orchestrate domain logic via ports.

pub mod billing_service;
pub mod dashboard_service;
pub mod planning_service;
pub mod report_service;
pub mod task_service;
pub mod watcher_service;

pub use billing_service::{BillingService, ChantierBilling};
pub use dashboard_service::{ChantierOverview, DashboardService, Portfolio};
pub use planning_service::{GanttChart, GanttRow, PlanningService, WorkloadRow, WorkloadTable};
pub use report_service::{ReportService, WeeklyReport};
pub use task_service::{NewTask, TaskService};
pub use watcher_service::WatcherService;
