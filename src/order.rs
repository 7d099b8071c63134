//! Manual ordering of an owner's task list.
//!
//! Positions are `f64` values with large gaps between them, so a drag-and-drop
//! move only rewrites the moved task: the new position is a value between its
//! new neighbours. Positions need not be unique; lists sort by
//! `(order_index, id)`. Collisions are never repaired implicitly; [`compact`]
//! renumbers a list on request.
//!
//! Concurrent single-task moves for the same owner are last-write-wins.

use rusqlite::Connection;

use crate::db::with_savepoint;
use crate::error::{Error, Result};
use crate::model::{OwnerId, Task};
use crate::ops::{check_batch, get_task, read_task_row, TASK_COLUMNS};
use crate::validate::{validate_order_index, ORDER_INDEX_LIMIT};

/// Gap between consecutive positions written by [`bulk_sequence`].
pub const SEQUENCE_STEP: f64 = 1000.0;

const MAX_INDEX: &str = "SELECT MAX(order_index) FROM tasks WHERE owner_id = ?1";

const SET_INDEX: &str = "
UPDATE tasks
SET order_index = ?1,
    updated_at = (strftime('%Y-%m-%dT%H:%M:%f', 'now') || '000Z')
WHERE id = ?2 AND owner_id = ?3
";

/// Position for a task appended to the end of the owner's list, strictly
/// greater than every existing one. `1.0` for an empty list. Fails once the
/// list has reached [`ORDER_INDEX_LIMIT`]; [`compact`] frees the range again.
pub fn next_index(conn: &Connection, owner: OwnerId) -> Result<f64> {
    let max: Option<f64> = conn.query_row(MAX_INDEX, [owner.get()], |row| row.get(0))?;
    let next = max.map_or(1.0, |m| m + 1.0);
    if next >= ORDER_INDEX_LIMIT {
        return Err(Error::invalid(
            "order_index",
            "no position left after the last task; compact the list",
        ));
    }
    Ok(next)
}

/// Move one task to an arbitrary position.
pub fn reindex(conn: &Connection, owner: OwnerId, task_id: i64, new_index: f64) -> Result<Task> {
    validate_order_index(new_index)?;
    let rows = conn.execute(SET_INDEX, rusqlite::params![new_index, task_id, owner.get()])?;
    if rows == 0 {
        return Err(Error::task_not_found(task_id));
    }
    log::debug!("owner {owner}: task {task_id} moved to {new_index}");
    get_task(conn, owner, task_id)
}

/// Renumber the listed tasks `1000, 2000, 3000, ...` in list order. Either
/// every task is renumbered or none is; the first id that does not name one
/// of the owner's tasks is reported.
pub fn bulk_sequence(conn: &Connection, owner: OwnerId, ordered_ids: &[i64]) -> Result<Vec<Task>> {
    check_batch(ordered_ids)?;
    let tasks = with_savepoint(conn, "bulk_sequence", || {
        ordered_ids
            .iter()
            .enumerate()
            .map(|(pos, &id)| reindex(conn, owner, id, (pos + 1) as f64 * SEQUENCE_STEP))
            .collect::<Result<Vec<_>>>()
    })?;
    log::info!("owner {owner}: sequenced {} tasks", tasks.len());
    Ok(tasks)
}

/// Position for a task dropped between two neighbours. Either neighbour may
/// be absent (start or end of the list).
pub fn index_between(before: Option<f64>, after: Option<f64>) -> f64 {
    match (before, after) {
        (Some(b), Some(a)) => b + (a - b) / 2.0,
        (Some(b), None) => b + SEQUENCE_STEP,
        (None, Some(a)) => a - SEQUENCE_STEP,
        (None, None) => SEQUENCE_STEP,
    }
}

/// Drop `task_id` between `before_id` and `after_id`. The neighbours must be
/// the owner's tasks.
pub fn move_between(
    conn: &Connection,
    owner: OwnerId,
    task_id: i64,
    before_id: Option<i64>,
    after_id: Option<i64>,
) -> Result<Task> {
    for neighbour in [before_id, after_id].into_iter().flatten() {
        if neighbour == task_id {
            return Err(Error::invalid(
                "neighbour",
                format!("task {task_id} cannot be placed next to itself"),
            ));
        }
    }
    let before = before_id
        .map(|id| get_task(conn, owner, id).map(|t| t.order_index))
        .transpose()?;
    let after = after_id
        .map(|id| get_task(conn, owner, id).map(|t| t.order_index))
        .transpose()?;
    reindex(conn, owner, task_id, index_between(before, after))
}

/// Renumber the owner's whole list with [`SEQUENCE_STEP`] gaps, keeping the
/// current order. Returns the number of tasks renumbered.
pub fn compact(conn: &Connection, owner: OwnerId) -> Result<usize> {
    with_savepoint(conn, "compact", || {
        let ids: Vec<i64> = {
            let mut stmt = conn.prepare(
                "SELECT id FROM tasks WHERE owner_id = ?1 ORDER BY order_index ASC, id ASC",
            )?;
            let rows = stmt.query_map([owner.get()], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        if ids.is_empty() {
            return Ok(0);
        }
        Ok(bulk_sequence(conn, owner, &ids)?.len())
    })
}

/// The owner's tasks in list order.
pub fn ordered(conn: &Connection, owner: OwnerId) -> Result<Vec<Task>> {
    let query = format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 ORDER BY order_index ASC, id ASC"
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map([owner.get()], read_task_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}
