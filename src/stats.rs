use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::db;
use crate::error::Result;
use crate::filter::Predicate;
use crate::model::{OwnerId, MAX_PRIORITY, MIN_PRIORITY};
use crate::query::count;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStats {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub overdue: u64,
    pub due_today: u64,
    pub high_priority: u64,
    /// Percentage in 0..=100.
    pub completion_rate: f64,
    /// Task count per priority; every level on the scale has an entry.
    pub priority_distribution: BTreeMap<u8, u64>,
}

fn completion_rate(completed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}

fn priority_distribution(conn: &Connection, owner: OwnerId) -> Result<BTreeMap<u8, u64>> {
    let base = Predicate::owned_by(owner);
    let query = format!(
        "SELECT priority, COUNT(*) FROM tasks WHERE {} GROUP BY priority",
        base.where_sql()
    );
    let mut distribution: BTreeMap<u8, u64> =
        (MIN_PRIORITY..=MAX_PRIORITY).map(|p| (p, 0)).collect();
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(base.params()), |row| {
        Ok((row.get::<_, u8>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (priority, n) = row?;
        distribution.insert(priority, n.max(0) as u64);
    }
    Ok(distribution)
}

/// Summary figures for one owner's tasks as of `now`. All counts are taken
/// inside one savepoint and so describe the same snapshot.
pub fn stats(
    conn: &Connection,
    owner: OwnerId,
    now: &DateTime<Utc>,
    high_priority_threshold: u8,
) -> Result<TaskStats> {
    db::with_savepoint(conn, "task_stats", || {
        let all = Predicate::owned_by(owner);
        let total = count(conn, &all)?;
        let completed = count(conn, &all.clone().completed(true))?;
        let overdue = count(conn, &all.clone().overdue(now))?;
        let due_today = count(conn, &all.clone().due_today(now))?;
        let high_priority = count(conn, &all.priority_at_least(high_priority_threshold))?;
        let priority_distribution = priority_distribution(conn, owner)?;
        log::debug!("owner {owner}: stats over {total} tasks");
        Ok(TaskStats {
            total,
            completed,
            pending: total - completed,
            overdue,
            due_today,
            high_priority,
            completion_rate: completion_rate(completed, total),
            priority_distribution,
        })
    })
}
