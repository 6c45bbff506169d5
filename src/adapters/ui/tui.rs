//! Implements InputPort. Inquire-based interactive dashboard.
//!
//! Main menu loops until Quit or Esc. A failing action is logged and shown,
//! then the menu comes back.

use crate::adapters::ui::{progress, render};
use crate::domain::{DomainError, Granularity, Tache, TaskStatus, UserContext};
use crate::ports::{InputPort, NotificationPort};
use crate::usecases::{
    BillingService, DashboardService, NewTask, PlanningService, ReportService, TaskService,
};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use inquire::error::{CustomUserError, InquireError};
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::validator::Validation;
use inquire::{CustomType, Select, Text};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

const GANTT_WIDTH: usize = 48;

/// Applies the prompt theme for every subsequent inquire prompt.
pub fn apply_theme() {
    let mut config = RenderConfig::default();
    config.prompt_prefix = Styled::new("▸").with_fg(Color::LightYellow);
    config.highlighted_option_prefix = Styled::new("➜").with_fg(Color::LightYellow);
    inquire::set_global_render_config(config);
}

fn prompt_err(e: InquireError) -> DomainError {
    DomainError::Prompt(e.to_string())
}

/// Parses an optional ISO date typed by the user. Empty input means none.
pub fn parse_date_input(input: &str) -> Result<Option<NaiveDate>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("Date attendue au format AAAA-MM-JJ : {}", input))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Portfolio,
    Overview,
    SetStatus,
    AddTask,
    Workload,
    Gantt,
    Billing,
    Reports,
    Notifications,
    Quit,
}

impl MenuAction {
    const ALL: [MenuAction; 10] = [
        MenuAction::Portfolio,
        MenuAction::Overview,
        MenuAction::SetStatus,
        MenuAction::AddTask,
        MenuAction::Workload,
        MenuAction::Gantt,
        MenuAction::Billing,
        MenuAction::Reports,
        MenuAction::Notifications,
        MenuAction::Quit,
    ];
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuAction::Portfolio => "Portefeuille des chantiers",
            MenuAction::Overview => "Détail d'un chantier",
            MenuAction::SetStatus => "Changer le statut d'une tâche",
            MenuAction::AddTask => "Ajouter une tâche",
            MenuAction::Workload => "Plan de charge",
            MenuAction::Gantt => "Planning (Gantt)",
            MenuAction::Billing => "Facturation",
            MenuAction::Reports => "Rapports hebdomadaires",
            MenuAction::Notifications => "Mes notifications",
            MenuAction::Quit => "Quitter",
        };
        f.write_str(label)
    }
}

/// Select option carrying an id next to its label.
struct Choice {
    id: String,
    label: String,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

struct TaskChoice(Tache);

impl fmt::Display for TaskChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.0;
        write!(
            f,
            "{} {} · {} (poids {})",
            render::status_tag(t.status),
            t.phase,
            t.title,
            t.weight
        )
    }
}

/// Services the dashboard drives.
pub struct TuiServices {
    pub dashboard: Arc<DashboardService>,
    pub tasks: Arc<TaskService>,
    pub planning: Arc<PlanningService>,
    pub billing: Arc<BillingService>,
    pub reports: Arc<ReportService>,
    pub notifications: Arc<dyn NotificationPort>,
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    ctx: UserContext,
    services: TuiServices,
    workload_buckets: usize,
}

impl TuiInputPort {
    pub fn new(ctx: UserContext, services: TuiServices, workload_buckets: usize) -> Self {
        Self {
            ctx,
            services,
            workload_buckets,
        }
    }

    async fn dispatch(&self, action: MenuAction) -> Result<(), DomainError> {
        match action {
            MenuAction::Portfolio => self.show_portfolio().await,
            MenuAction::Overview => self.show_overview().await,
            MenuAction::SetStatus => self.set_task_status().await,
            MenuAction::AddTask => self.add_task().await,
            MenuAction::Workload => self.show_workload().await,
            MenuAction::Gantt => self.show_gantt().await,
            MenuAction::Billing => self.show_billing().await,
            MenuAction::Reports => self.write_reports().await,
            MenuAction::Notifications => self.show_notifications().await,
            MenuAction::Quit => Ok(()),
        }
    }

    /// None when there is no chantier or the user pressed Esc.
    async fn pick_chantier(&self) -> Result<Option<String>, DomainError> {
        let portfolio = self.services.dashboard.portfolio().await?;
        if portfolio.chantiers.is_empty() {
            println!("Aucun chantier");
            return Ok(None);
        }
        let options: Vec<Choice> = portfolio
            .chantiers
            .into_iter()
            .map(|o| Choice {
                label: format!("{} ({} %)", o.chantier.name, o.progress),
                id: o.chantier.id,
            })
            .collect();
        let picked = Select::new("Chantier :", options)
            .prompt_skippable()
            .map_err(prompt_err)?;
        Ok(picked.map(|c| c.id))
    }

    async fn show_portfolio(&self) -> Result<(), DomainError> {
        let portfolio = self.services.dashboard.portfolio().await?;
        println!("{}", render::render_portfolio(&portfolio));
        Ok(())
    }

    async fn show_overview(&self) -> Result<(), DomainError> {
        let Some(id) = self.pick_chantier().await? else {
            return Ok(());
        };
        let o = self.services.dashboard.chantier_overview(&id).await?;
        println!(
            "\n{}  {} %  ({}/{} tâches terminées)",
            o.chantier.name, o.progress, o.done_count, o.task_count
        );
        progress::show_phases(&o.phases);
        if !o.blocked.is_empty() {
            println!("\nBloquées :");
            for t in &o.blocked {
                println!("  [!] {} · {}", t.phase, t.title);
            }
        }
        println!();
        Ok(())
    }

    async fn set_task_status(&self) -> Result<(), DomainError> {
        let Some(chantier_id) = self.pick_chantier().await? else {
            return Ok(());
        };
        let tasks = self.services.tasks.list_tasks(&chantier_id).await?;
        if tasks.is_empty() {
            println!("Aucune tâche sur ce chantier");
            return Ok(());
        }
        let options: Vec<TaskChoice> = tasks.into_iter().map(TaskChoice).collect();
        let Some(TaskChoice(task)) = Select::new("Tâche :", options)
            .prompt_skippable()
            .map_err(prompt_err)?
        else {
            return Ok(());
        };
        let Some(status) = Select::new("Nouveau statut :", TaskStatus::ALL.to_vec())
            .prompt_skippable()
            .map_err(prompt_err)?
        else {
            return Ok(());
        };
        let overview = self
            .services
            .tasks
            .set_status(&self.ctx, &task.id, status)
            .await?;
        println!(
            "✔ {} → {}. Avancement du chantier : {} %",
            task.title, status, overview.progress
        );
        Ok(())
    }

    async fn add_task(&self) -> Result<(), DomainError> {
        let Some(chantier_id) = self.pick_chantier().await? else {
            return Ok(());
        };
        let Some(title) = Text::new("Intitulé :")
            .prompt_skippable()
            .map_err(prompt_err)?
        else {
            return Ok(());
        };
        let Some(phase) = Text::new("Phase :")
            .with_default("Exécution")
            .prompt_skippable()
            .map_err(prompt_err)?
        else {
            return Ok(());
        };
        let Some(weight) = CustomType::<f64>::new("Poids :")
            .with_default(1.0)
            .with_error_message("Nombre attendu")
            .prompt_skippable()
            .map_err(prompt_err)?
        else {
            return Ok(());
        };
        let date_validator = |s: &str| -> Result<Validation, CustomUserError> {
            Ok(match parse_date_input(s) {
                Ok(_) => Validation::Valid,
                Err(msg) => Validation::Invalid(msg.into()),
            })
        };
        let start = Text::new("Début (AAAA-MM-JJ, vide si inconnu) :")
            .with_validator(date_validator)
            .prompt_skippable()
            .map_err(prompt_err)?
            .unwrap_or_default();
        let end = Text::new("Fin (AAAA-MM-JJ, vide si inconnue) :")
            .with_validator(date_validator)
            .prompt_skippable()
            .map_err(prompt_err)?
            .unwrap_or_default();

        let task = self
            .services
            .tasks
            .add_task(
                &self.ctx,
                NewTask {
                    chantier_id,
                    title,
                    phase,
                    weight,
                    start_date: parse_date_input(&start).map_err(DomainError::Validation)?,
                    end_date: parse_date_input(&end).map_err(DomainError::Validation)?,
                },
            )
            .await?;
        println!("✔ Tâche créée : {}", task.title);
        Ok(())
    }

    async fn show_workload(&self) -> Result<(), DomainError> {
        let Some(granularity) = Select::new(
            "Découpage :",
            vec![Granularity::Week, Granularity::Month],
        )
        .prompt_skippable()
        .map_err(prompt_err)?
        else {
            return Ok(());
        };
        let table = self
            .services
            .planning
            .workload(granularity, Local::now().date_naive(), self.workload_buckets)
            .await?;
        println!("{}", render::render_workload(&table));
        Ok(())
    }

    async fn show_gantt(&self) -> Result<(), DomainError> {
        let portfolio = self.services.dashboard.portfolio().await?;
        let mut options = vec![Choice {
            id: String::new(),
            label: "Tous les chantiers".to_string(),
        }];
        options.extend(portfolio.chantiers.into_iter().map(|o| Choice {
            label: format!("Tâches : {}", o.chantier.name),
            id: o.chantier.id,
        }));
        let Some(choice) = Select::new("Planning :", options)
            .prompt_skippable()
            .map_err(prompt_err)?
        else {
            return Ok(());
        };
        let chart = if choice.id.is_empty() {
            self.services.planning.gantt(None).await?
        } else {
            self.services.planning.task_gantt(&choice.id).await?
        };
        match chart {
            Some(chart) => println!("{}", render::render_gantt(&chart, GANTT_WIDTH)),
            None => println!("Aucune date renseignée"),
        }
        Ok(())
    }

    async fn show_billing(&self) -> Result<(), DomainError> {
        let Some(id) = self.pick_chantier().await? else {
            return Ok(());
        };
        let billing = self.services.billing.summary(&id).await?;
        println!("{}", render::render_billing(&billing));
        Ok(())
    }

    async fn write_reports(&self) -> Result<(), DomainError> {
        let pb = progress::spinner("Génération des rapports…");
        let result = self
            .services
            .reports
            .write_all(Local::now().date_naive())
            .await;
        pb.finish_and_clear();
        let paths = result?;
        println!("✔ {} rapport(s) écrit(s)", paths.len());
        for p in &paths {
            println!("  {}", p.display());
        }
        Ok(())
    }

    async fn show_notifications(&self) -> Result<(), DomainError> {
        let list = self
            .services
            .notifications
            .list_notifications(&self.ctx.user_id)
            .await?;
        println!("{}", render::render_notifications(&list));
        let marked = self
            .services
            .notifications
            .mark_notifications_read(&self.ctx.user_id)
            .await?;
        debug!(user_id = %self.ctx.user_id, marked, "notifications marked read");
        Ok(())
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let action = Select::new("Que voulez-vous faire ?", MenuAction::ALL.to_vec())
                .with_page_size(MenuAction::ALL.len())
                .prompt_skippable();
            let action = match action {
                Ok(Some(MenuAction::Quit)) | Ok(None) => break,
                Ok(Some(a)) => a,
                Err(InquireError::OperationInterrupted) => break,
                Err(e) => return Err(prompt_err(e)),
            };
            if let Err(e) = self.dispatch(action).await {
                warn!(action = %action, error = %e, "dashboard action failed");
                eprintln!("✖ {}", e);
            }
        }
        info!(user_id = %self.ctx.user_id, "dashboard closed");
        Ok(())
    }
}
