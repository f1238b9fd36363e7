//! CLI module
//!
//! This module provides the command-line interface: `serve` runs the API
//! server, every other command talks to a running server over HTTP.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;

use crate::{
    api::{serve, Client, ClientConfig, HttpClientImpl, ServerConfig},
    archive::{default_archive_path, JsonFileStore},
    core::{Core, PlanResponse},
    models::{GeneratedDay, GeneratedPlan, GeneratedTask, HistoryItem, PlanRequest, PlanState, Task},
    planner::{GeminiConfig, GeminiPlanner, DEFAULT_BASE_URL, DEFAULT_MODEL},
    search::SearchView,
    session::{Session, SessionView},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API server URL
    #[arg(short, long, default_value = "http://localhost:3000")]
    server: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the goal-architect API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// Start with an example plan loaded
        #[arg(long)]
        example: bool,

        /// API key for the planning service
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, default_value = "")]
        api_key: String,

        /// Model used for plan generation and task breakdown
        #[arg(long, env = "GOAL_ARCHITECT_MODEL", default_value = DEFAULT_MODEL)]
        model: String,

        /// Path of the history archive (defaults to ~/.goal-architect/history.json)
        #[arg(long, env = "GOAL_ARCHITECT_ARCHIVE")]
        archive: Option<PathBuf>,
    },

    /// Generate a new plan for a goal
    Generate {
        /// What you want to achieve
        goal: String,

        /// How long the plan should span
        #[arg(short, long, default_value = "1 Week")]
        duration: String,
    },

    /// Generate again from the last goal and duration
    Regenerate,

    /// Show the current plan
    Plan,

    /// Show session status
    Status,

    /// Toggle completion of a task
    Toggle {
        /// Day number (starting from 1)
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        day: u32,
        task_id: String,
    },

    /// Expand or collapse a task's subtasks
    Expand {
        /// Day number (starting from 1)
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        day: u32,
        task_id: String,
    },

    /// Set or clear a task reminder
    Remind {
        /// Day number (starting from 1)
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        day: u32,
        task_id: String,

        /// RFC 3339 timestamp, e.g. 2024-05-01T09:00:00Z. Omit to clear.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Break a task down into smaller steps
    Breakdown {
        /// Day number (starting from 1)
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        day: u32,
        task_id: String,
    },

    /// Move a top-level task to another day or position
    Move {
        /// Day number the task is on
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        from_day: u32,

        /// Day number to move it to
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        to_day: u32,

        task_id: String,

        /// Position in the destination day (starting from 0); appends when omitted
        #[arg(short, long)]
        index: Option<usize>,
    },

    /// Mark several tasks complete (or incomplete) at once
    Bulk {
        /// Task ids to update
        #[arg(required = true)]
        task_ids: Vec<String>,

        /// Mark the tasks incomplete instead
        #[arg(long)]
        incomplete: bool,
    },

    /// Undo the last change
    Undo,

    /// Redo the last undone change
    Redo,

    /// Discard the current plan
    Discard,

    /// Show only tasks matching a query
    Search { query: String },

    /// Export the plan as markdown
    Export {
        /// Write to a file instead of stdout; pass a directory to use the default name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// History archive commands
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List saved plans, newest first
    List,

    /// Save the current plan
    Save,

    /// Load a saved plan
    Load { id: String },

    /// Load the most recently saved plan
    Last,

    /// Rename a saved plan
    Rename { id: String, name: String },

    /// Delete a saved plan
    Delete { id: String },
}

/// Run the CLI application
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Serve {
        port,
        example,
        api_key,
        model,
        archive,
    } = &cli.command
    {
        return run_server(*port, *example, api_key, model, archive.clone()).await;
    }

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, bin_name, &mut io::stdout());
        return Ok(());
    }

    let client = create_client(&cli.server);

    match &cli.command {
        Commands::Serve { .. } | Commands::Completions { .. } => Ok(()),

        Commands::Generate { goal, duration } => {
            println!("Generating a {} plan for \"{}\"...", duration, goal);
            let response = client.generate(goal.clone(), duration.clone()).await?;
            print_response(&response, |_| {
                println!("{}", "Plan ready.".green());
            });
            print_plan(&client.get_plan().await?);
            Ok(())
        }

        Commands::Regenerate => {
            let response = client.regenerate().await?;
            if *response.inner() {
                print_plan(&client.get_plan().await?);
            } else {
                println!("Nothing to regenerate. Generate a plan first.");
            }
            Ok(())
        }

        Commands::Plan => {
            print_plan(&client.get_plan().await?);
            Ok(())
        }

        Commands::Status => {
            print_session(&client.get_session().await?);
            Ok(())
        }

        Commands::Toggle { day, task_id } => {
            let response = client.toggle_task(day_index(*day), task_id.clone()).await?;
            print_response(&response, |changed| {
                report_change(*changed, &format!("Toggled task {}", task_id));
            });
            Ok(())
        }

        Commands::Expand { day, task_id } => {
            let response = client.expand_task(day_index(*day), task_id.clone()).await?;
            print_response(&response, |changed| {
                report_change(*changed, &format!("Toggled expansion of task {}", task_id));
            });
            Ok(())
        }

        Commands::Remind { day, task_id, at } => {
            let response = client
                .set_reminder(day_index(*day), task_id.clone(), *at)
                .await?;
            print_response(&response, |changed| {
                let message = match at {
                    Some(at) => format!("Reminder for task {} set to {}", task_id, at.to_rfc3339()),
                    None => format!("Reminder for task {} cleared", task_id),
                };
                report_change(*changed, &message);
            });
            Ok(())
        }

        Commands::Breakdown { day, task_id } => {
            println!("Breaking down task {}...", task_id);
            let response = client.break_down(day_index(*day), task_id.clone()).await?;
            print_response(&response, |changed| {
                report_change(*changed, &format!("Broke down task {}", task_id));
            });
            Ok(())
        }

        Commands::Move {
            from_day,
            to_day,
            task_id,
            index,
        } => {
            let response = client
                .move_task(day_index(*from_day), day_index(*to_day), task_id.clone(), *index)
                .await?;
            print_response(&response, |changed| {
                report_change(
                    *changed,
                    &format!("Moved task {} from day {} to day {}", task_id, from_day, to_day),
                );
            });
            Ok(())
        }

        Commands::Bulk {
            task_ids,
            incomplete,
        } => {
            let response = client.bulk_set_status(task_ids.clone(), !incomplete).await?;
            print_response(&response, |changed| {
                let state = if *incomplete { "incomplete" } else { "complete" };
                report_change(*changed, &format!("Marked {} tasks {}", task_ids.len(), state));
            });
            Ok(())
        }

        Commands::Undo => {
            let response = client.undo().await?;
            print_response(&response, |changed| report_change(*changed, "Undone"));
            Ok(())
        }

        Commands::Redo => {
            let response = client.redo().await?;
            print_response(&response, |changed| report_change(*changed, "Redone"));
            Ok(())
        }

        Commands::Discard => {
            let response = client.discard().await?;
            print_response(&response, |_| println!("Plan discarded"));
            Ok(())
        }

        Commands::Search { query } => {
            print_search(&client.search(query.clone()).await?);
            Ok(())
        }

        Commands::Export { output } => {
            let export = client.export().await?;
            match output {
                Some(path) => {
                    let path = if path.is_dir() {
                        path.join(&export.file_name)
                    } else {
                        path.clone()
                    };
                    std::fs::write(&path, export.content)?;
                    println!("Exported plan to {}", path.display());
                }
                None => print!("{}", export.content),
            }
            Ok(())
        }

        Commands::History { command } => run_history(&client, command).await,
    }
}

async fn run_server(
    port: u16,
    example: bool,
    api_key: &str,
    model: &str,
    archive: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Starting goal-architect API server on port {}...", port);

    let archive_path = match archive {
        Some(path) => path,
        None => default_archive_path()?,
    };
    println!("History archive: {}", archive_path.display());
    let mut session = Session::init(Box::new(JsonFileStore::new(archive_path)));

    if api_key.is_empty() {
        println!(
            "{}",
            "No GEMINI_API_KEY set: plan generation and breakdown will fail.".yellow()
        );
    }
    let planner = GeminiPlanner::new(GeminiConfig {
        api_key: api_key.to_string(),
        model: model.to_string(),
        base_url: DEFAULT_BASE_URL.to_string(),
    });

    if example {
        println!("Loading example plan...");
        session.install_generated(
            PlanRequest {
                goal: "Learn to play guitar".to_string(),
                duration: "3 Days".to_string(),
            },
            example_plan(),
        );
    }

    let core = Core::new(session, Arc::new(planner));

    let config = ServerConfig {
        address: ([127, 0, 0, 1], port).into(),
    };

    serve(core, config).await?;
    Ok(())
}

async fn run_history(
    client: &HttpClientImpl,
    command: &HistoryCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        HistoryCommands::List => {
            print_history(&client.list_history().await?);
        }
        HistoryCommands::Save => {
            let response = client.save_history().await?;
            print_response(&response, |id| println!("Saved plan as {}", id.cyan()));
        }
        HistoryCommands::Load { id } => {
            let response = client.load_history(id.clone()).await?;
            print_response(&response, |loaded| {
                report_change(*loaded, &format!("Loaded plan {}", id));
            });
        }
        HistoryCommands::Last => {
            let response = client.load_last_session().await?;
            print_response(&response, |loaded| {
                report_change(*loaded, "Loaded the most recent plan");
            });
        }
        HistoryCommands::Rename { id, name } => {
            let response = client.rename_history(id.clone(), name.clone()).await?;
            print_response(&response, |renamed| {
                report_change(*renamed, &format!("Renamed {} to \"{}\"", id, name.trim()));
            });
        }
        HistoryCommands::Delete { id } => {
            let response = client.delete_history(id.clone()).await?;
            print_response(&response, |deleted| {
                report_change(*deleted, &format!("Deleted {}", id));
            });
        }
    }
    Ok(())
}

fn create_client(server_url: &str) -> HttpClientImpl {
    let config = ClientConfig {
        base_url: server_url.to_string(),
    };
    HttpClientImpl::with_config(config)
}

/// CLI day numbers start at 1, the API's day indices at 0
fn day_index(day: u32) -> usize {
    day.saturating_sub(1) as usize
}

fn report_change(changed: bool, message: &str) {
    if changed {
        println!("{}", message.green());
    } else {
        println!("{}", "Nothing changed (unknown task or day?)".dimmed());
    }
}

/// Prints the inner value with the provided closure, then a one-line session summary
fn print_response<T, F>(response: &PlanResponse<T>, print_inner: F)
where
    F: FnOnce(&T),
{
    print_inner(response.inner());

    let session = &response.session;
    if let Some(error) = &session.error {
        println!("{} {}", "Error:".red().bold(), error);
    }
    if session.has_plan {
        println!(
            "{}",
            format!(
                "Progress {}% ({}/{}) | undo {} | redo {}",
                session.progress,
                session.counts.completed,
                session.counts.total,
                session.undo_depth,
                session.redo_depth
            )
            .dimmed()
        );
    }
}

fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent) / 5;
    format!(
        "{}{}",
        "━".repeat(filled).green(),
        "━".repeat(20 - filled).bright_black()
    )
}

fn print_plan(response: &PlanResponse<Option<PlanState>>) {
    let Some(plan) = response.inner() else {
        println!("No plan yet. Create one with 'goal-architect generate \"<goal>\"'");
        return;
    };

    println!("\n{}", plan.plan_title.bold().magenta());
    println!("{}", plan.overview.italic());
    println!("{} {}%\n", progress_bar(plan.progress()), plan.progress());

    for day in &plan.days {
        let counts = day.counts();
        let date = plan
            .day_date(day.day_number)
            .map(|d| format!(" ({})", d.format("%a %b %d")))
            .unwrap_or_default();
        println!(
            "{} {}{}  {}",
            format!("Day {}:", day.day_number).bold().cyan(),
            day.day_label.bold(),
            date.dimmed(),
            format!("{}/{}", counts.completed, counts.total).dimmed()
        );
        println!("  {} {}", "Focus:".dimmed(), day.theme);
        for task in day.tasks.iter() {
            print_task(task, 1);
        }
        println!();
    }
}

/// Recursively prints a task and its visible subtasks
fn print_task(task: &Task, depth: usize) {
    let indent = "  ".repeat(depth);
    let checkbox = if task.is_completed() {
        "●".green()
    } else {
        "○".bright_black()
    };
    let text = if task.is_completed() {
        task.description().dimmed().strikethrough()
    } else {
        task.description().normal()
    };
    println!("{}{} {} {}", indent, checkbox, text, format!("[{}]", task.id()).dimmed());

    if let Some(reminder) = task.reminder() {
        println!("{}  {} {}", indent, "⏰".yellow(), reminder.format("%Y-%m-%d %H:%M"));
    }
    if let Some(link) = task.video_link() {
        println!("{}  {} {}", indent, "▶".red(), link.blue().underline());
    }

    if task.is_leaf() {
        return;
    }
    if task.is_expanded() {
        for subtask in task.subtasks() {
            print_task(subtask, depth + 1);
        }
    } else {
        println!(
            "{}  {}",
            indent,
            format!("+{} hidden subtasks", task.subtasks().len()).dimmed()
        );
    }
}

fn print_session(session: &SessionView) {
    match &session.plan_title {
        Some(title) => println!("{} {}", "Plan:".bold(), title),
        None => println!("{}", "No plan loaded".dimmed()),
    }
    if session.has_plan {
        println!("{} {}%", progress_bar(session.progress), session.progress);
    }
    println!("Undo steps: {}  Redo steps: {}", session.undo_depth, session.redo_depth);
    println!("Can regenerate: {}", session.can_regenerate);
    if let Some(id) = &session.active_history_id {
        println!("Saved as: {}", id.cyan());
    }
    if session.is_generating {
        println!("{}", "Generating a plan...".yellow());
    }
    if !session.breaking_down.is_empty() {
        println!("Breaking down: {}", session.breaking_down.join(", "));
    }
    if let Some(error) = &session.error {
        println!("{} {}", "Error:".red().bold(), error);
    }
    if !session.recent_activity.is_empty() {
        println!("\n{}", "Recent activity:".bold());
        for entry in &session.recent_activity {
            println!(
                "  {} {} {}",
                entry.timestamp.format("%H:%M:%S").to_string().dimmed(),
                entry.action,
                entry.details.as_deref().unwrap_or_default()
            );
        }
    }
}

fn print_search(view: &SearchView) {
    let mut shown = 0;
    for day in view.visible_days() {
        println!(
            "{} {}  {}",
            format!("Day {}:", day.day_number).bold().cyan(),
            day.day_label.bold(),
            format!("{}% done", day.progress).dimmed()
        );
        for task in &day.tasks {
            print_task(task, 1);
            shown += 1;
        }
    }
    if shown == 0 {
        println!("No tasks match \"{}\"", view.query);
    }
}

fn print_history(items: &[HistoryItem]) {
    if items.is_empty() {
        println!("No saved plans. Save one with 'goal-architect history save'");
        return;
    }
    for item in items {
        println!(
            "{}  {}  {}  {}",
            item.id.cyan(),
            item.name.bold(),
            item.timestamp
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .dimmed(),
            format!("{}%", item.plan.progress()).green()
        );
    }
}

/// A small built-in plan for trying the server without the planning service
fn example_plan() -> GeneratedPlan {
    fn task(description: &str, video_link: Option<&str>) -> GeneratedTask {
        GeneratedTask {
            description: description.to_string(),
            video_link: video_link.map(str::to_string),
        }
    }

    GeneratedPlan {
        plan_title: "Learn to Play Guitar".to_string(),
        overview: "Three short sessions covering setup, first chords and a first song.".to_string(),
        days: vec![
            GeneratedDay {
                day_number: 1,
                day_label: "Getting Set Up".to_string(),
                theme: "Posture and tuning".to_string(),
                tasks: vec![
                    task(
                        "Tune the guitar with a tuner app",
                        Some("https://www.youtube.com/results?search_query=how+to+tune+a+guitar"),
                    ),
                    task("Practice holding the pick for 10 minutes", None),
                ],
            },
            GeneratedDay {
                day_number: 2,
                day_label: "First Chords".to_string(),
                theme: "Open chords".to_string(),
                tasks: vec![
                    task(
                        "Learn G, C and D major",
                        Some("https://www.youtube.com/results?search_query=beginner+guitar+G+C+D+chords"),
                    ),
                    task("Switch between chords to a metronome", None),
                ],
            },
            GeneratedDay {
                day_number: 3,
                day_label: "First Song".to_string(),
                theme: "Putting it together".to_string(),
                tasks: vec![task("Play a three-chord song start to finish", None)],
            },
        ],
    }
}
