//! Search projection
//!
//! Derives a filtered view of the plan for a query without touching the
//! committed plan. A top-level task stays visible when it or any descendant
//! matches; kept tasks carry their full subtree.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{DayPlan, PlanState, Task, TaskCounts};

/// Case-insensitive substring match on the description
fn matches(task: &Task, needle: &str) -> bool {
    task.description().to_lowercase().contains(needle)
}

fn subtree_matches(task: &Task, needle: &str) -> bool {
    matches(task, needle) || task.subtasks().iter().any(|t| subtree_matches(t, needle))
}

/// Filters every day's top-level tasks by `query`.
///
/// An empty or whitespace-only query returns the days unchanged.
pub fn filter_days(days: &[DayPlan], query: &str) -> Vec<DayPlan> {
    if query.trim().is_empty() {
        return days.to_vec();
    }

    let needle = query.to_lowercase();
    days.iter()
        .map(|day| {
            let kept: Vec<Task> = day
                .tasks
                .iter()
                .filter(|task| subtree_matches(task, &needle))
                .cloned()
                .collect();
            DayPlan {
                tasks: Arc::new(kept),
                ..day.clone()
            }
        })
        .collect()
}

/// One day as presented while searching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayView {
    pub day_index: usize,
    pub day_number: u32,
    pub day_label: String,
    pub theme: String,
    /// Calendar date derived from the plan start date
    pub date: Option<NaiveDate>,
    /// Tasks that survive the filter
    pub tasks: Vec<Task>,
    /// Counts over the live, unfiltered tree
    pub counts: TaskCounts,
    pub progress: u8,
}

/// The filtered projection of a whole plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchView {
    pub query: String,
    pub days: Vec<DayView>,
}

impl SearchView {
    /// Days that still show at least one task
    pub fn visible_days(&self) -> impl Iterator<Item = &DayView> {
        self.days.iter().filter(|day| !day.tasks.is_empty())
    }
}

/// Builds the search projection for `plan`
pub fn search(plan: &PlanState, query: &str) -> SearchView {
    let filtered = filter_days(&plan.days, query);

    let days = plan
        .days
        .iter()
        .zip(filtered)
        .enumerate()
        .map(|(day_index, (live, projected))| {
            let counts = live.counts();
            DayView {
                day_index,
                day_number: live.day_number,
                day_label: live.day_label.clone(),
                theme: live.theme.clone(),
                date: plan.day_date(live.day_number),
                tasks: projected.tasks.as_ref().clone(),
                counts,
                progress: counts.percent(),
            }
        })
        .collect();

    SearchView {
        query: query.to_string(),
        days,
    }
}
