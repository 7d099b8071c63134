use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::model::{Category, Task};
use crate::query::TaskPage;
use crate::stats::TaskStats;

#[derive(Serialize)]
pub struct TaskDetail<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub band: &'static str,
    pub category: Option<&'a Category>,
}

impl<'a> TaskDetail<'a> {
    pub fn new(task: &'a Task, category: Option<&'a Category>) -> Self {
        Self {
            task,
            band: task.band().as_str(),
            category,
        }
    }
}

/// RFC 3339 in UTC; the fraction only appears when it is non-zero.
fn show_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn format_task_detail(task: &Task, category: Option<&Category>) -> String {
    let mut out = String::new();
    out.push_str(&format!("Id:          {}\n", task.id));
    out.push_str(&format!("Title:       {}\n", task.title));
    out.push_str(&format!(
        "Status:      {}\n",
        if task.completed { "completed" } else { "pending" }
    ));
    out.push_str(&format!("Priority:    {} ({})\n", task.priority, task.band()));
    if let Some(ref d) = task.description {
        out.push_str(&format!("Description: {d}\n"));
    }
    if let Some(ref due) = task.due_date {
        out.push_str(&format!("Due:         {}\n", show_time(due)));
    }
    if let Some(c) = category {
        out.push_str(&format!("Category:    {} ({})\n", c.name, c.color));
    } else if let Some(id) = task.category_id {
        out.push_str(&format!("Category:    {id}\n"));
    }
    out.push_str(&format!("Order:       {}\n", task.order_index));
    out.push_str(&format!("Created:     {}\n", show_time(&task.created_at)));
    out.push_str(&format!("Updated:     {}\n", show_time(&task.updated_at)));
    out
}

pub fn format_task_list(tasks: &[Task]) -> String {
    let mut out = String::new();
    for task in tasks {
        let due = task
            .due_date
            .as_ref()
            .map(|d| format!(" (due {})", show_time(d)))
            .unwrap_or_default();
        out.push_str(&format!(
            "{} {:>4} p{:<2} {}{}\n",
            task.icon(),
            task.id,
            task.priority,
            task.title,
            due
        ));
    }
    out
}

/// Task lines followed by a one-line summary of where the page sits.
pub fn format_task_page(page: &TaskPage) -> String {
    let mut out = format_task_list(&page.tasks);
    out.push_str(&format!(
        "-- {} of {} (page {}, size {})\n",
        page.tasks.len(),
        page.total,
        page.page,
        page.size
    ));
    out
}

pub fn format_stats(stats: &TaskStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total:         {}\n", stats.total));
    out.push_str(&format!("Completed:     {}\n", stats.completed));
    out.push_str(&format!("Pending:       {}\n", stats.pending));
    out.push_str(&format!("Overdue:       {}\n", stats.overdue));
    out.push_str(&format!("Due today:     {}\n", stats.due_today));
    out.push_str(&format!("High priority: {}\n", stats.high_priority));
    out.push_str(&format!("Completion:    {:.1}%\n", stats.completion_rate));
    out.push_str("By priority:\n");
    for (priority, n) in &stats.priority_distribution {
        out.push_str(&format!("  {priority:>2}: {n}\n"));
    }
    out
}

pub fn format_categories(categories: &[Category]) -> String {
    let mut out = String::new();
    for c in categories {
        let desc = c
            .description
            .as_ref()
            .map(|d| format!("  {d}"))
            .unwrap_or_default();
        out.push_str(&format!("{:>4} {} {}{}\n", c.id, c.color, c.name, desc));
    }
    out
}
