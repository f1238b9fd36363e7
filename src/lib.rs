//! Goal architect library crate
//!
//! Turns a goal and a duration into a multi-day plan of tasks, then tracks
//! progress on it: completion, reminders, task breakdown, moving tasks
//! between days, undo/redo and a saved-plan history.

pub mod api;
pub mod archive;
pub mod cli;
pub mod core;
pub mod export;
pub mod models;
pub mod planner;
pub mod relocation;
pub mod search;
pub mod session;
pub mod tree;
pub mod versioning;

pub use crate::core::{Core, PlanResponse};
pub use archive::{ArchiveStore, HistoryArchive, JsonFileStore, MemoryStore, StorageError};
pub use models::{DayPlan, HistoryItem, PlanRequest, PlanState, Task, TaskCounts, TaskList};
pub use planner::{GeminiPlanner, Planner, PlannerError};
pub use session::{Session, SessionError, SessionView};
