use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension};

use crate::db::{parse_timestamp, timestamp, with_savepoint};
use crate::error::{Error, Result};
use crate::model::{Category, NewTask, OwnerId, Task, TaskPatch, DEFAULT_PRIORITY};
use crate::order;
use crate::validate::{
    validate_category_name, validate_color, validate_description, validate_order_index,
    validate_priority, validate_title,
};

pub const DEFAULT_CATEGORY_COLOR: &str = "#3B82F6";

pub(crate) const TASK_COLUMNS: &str = "id, owner_id, title, description, completed, priority, \
     due_date, order_index, category_id, created_at, updated_at";

pub(crate) fn read_task_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let due_date: Option<String> = row.get(6)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(Task {
        id: row.get(0)?,
        owner: OwnerId::new(row.get(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        completed: row.get(4)?,
        priority: row.get(5)?,
        due_date: due_date
            .as_deref()
            .map(|raw| parse_timestamp(6, raw))
            .transpose()?,
        order_index: row.get(7)?,
        category_id: row.get(8)?,
        created_at: parse_timestamp(9, &created_at)?,
        updated_at: parse_timestamp(10, &updated_at)?,
    })
}

const CATEGORY_COLUMNS: &str = "id, owner_id, name, description, color, created_at";

fn read_category_row(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    let created_at: String = row.get(5)?;
    Ok(Category {
        id: row.get(0)?,
        owner: OwnerId::new(row.get(1)?),
        name: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        created_at: parse_timestamp(5, &created_at)?,
    })
}

const INSERT_TASK: &str = "
INSERT INTO tasks (owner_id, title, description, priority, due_date, order_index, category_id)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
";

const WRITE_TASK: &str = "
UPDATE tasks
SET title = ?1, description = ?2, completed = ?3, priority = ?4, due_date = ?5,
    order_index = ?6, category_id = ?7,
    updated_at = (strftime('%Y-%m-%dT%H:%M:%f', 'now') || '000Z')
WHERE id = ?8 AND owner_id = ?9
";

const TOGGLE_TASK: &str = "
UPDATE tasks
SET completed = 1 - completed,
    updated_at = (strftime('%Y-%m-%dT%H:%M:%f', 'now') || '000Z')
WHERE id = ?1 AND owner_id = ?2
";

/// Turn a UNIQUE constraint failure into `Duplicate`; other storage errors
/// pass through.
fn duplicate_or_storage(err: rusqlite::Error, entity: &'static str, name: &str) -> Error {
    if let rusqlite::Error::SqliteFailure(e, _) = &err {
        if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return Error::Duplicate {
                entity,
                name: name.to_string(),
            };
        }
    }
    err.into()
}

fn require_category(conn: &Connection, owner: OwnerId, id: i64) -> Result<()> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM categories WHERE id = ?1 AND owner_id = ?2",
        rusqlite::params![id, owner.get()],
        |row| row.get(0),
    )?;
    if count == 0 {
        return Err(Error::category_not_found(id));
    }
    Ok(())
}

/// Reject empty batches and batches naming the same task twice.
pub(crate) fn check_batch(ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Err(Error::EmptyBatch);
    }
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id) {
            return Err(Error::invalid("task_ids", format!("task {id} appears more than once")));
        }
    }
    Ok(())
}

pub fn add_task(conn: &Connection, owner: OwnerId, new: &NewTask) -> Result<Task> {
    let title = validate_title(&new.title)?;
    validate_description(new.description.as_deref())?;
    let priority = new.priority.unwrap_or(DEFAULT_PRIORITY);
    validate_priority(priority)?;
    if let Some(category_id) = new.category_id {
        require_category(conn, owner, category_id)?;
    }
    let order_index = match new.order_index {
        Some(index) => {
            validate_order_index(index)?;
            index
        }
        None => order::next_index(conn, owner)?,
    };
    conn.execute(
        INSERT_TASK,
        rusqlite::params![
            owner.get(),
            title,
            new.description,
            priority,
            new.due_date.as_ref().map(timestamp),
            order_index,
            new.category_id,
        ],
    )
    .map_err(|e| duplicate_or_storage(e, "task", &title))?;
    let id = conn.last_insert_rowid();
    log::info!("owner {owner}: created task {id} at order_index {order_index}");
    get_task(conn, owner, id)
}

pub fn get_task(conn: &Connection, owner: OwnerId, id: i64) -> Result<Task> {
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND owner_id = ?2");
    conn.query_row(&query, rusqlite::params![id, owner.get()], read_task_row)
        .optional()?
        .ok_or_else(|| Error::task_not_found(id))
}

/// Validate every supplied field of a patch once, returning it with the
/// title trimmed.
fn validate_patch(conn: &Connection, owner: OwnerId, patch: &TaskPatch) -> Result<TaskPatch> {
    let mut patch = patch.clone();
    if let Some(title) = &patch.title {
        patch.title = Some(validate_title(title)?);
    }
    if let Some(description) = &patch.description {
        validate_description(description.as_deref())?;
    }
    if let Some(priority) = patch.priority {
        validate_priority(priority)?;
    }
    if let Some(index) = patch.order_index {
        validate_order_index(index)?;
    }
    if let Some(Some(category_id)) = patch.category_id {
        require_category(conn, owner, category_id)?;
    }
    Ok(patch)
}

fn write_patch(conn: &Connection, owner: OwnerId, id: i64, patch: &TaskPatch) -> Result<Task> {
    let mut task = get_task(conn, owner, id)?;
    patch.apply_to(&mut task);
    conn.execute(
        WRITE_TASK,
        rusqlite::params![
            task.title,
            task.description,
            task.completed,
            task.priority,
            task.due_date.as_ref().map(timestamp),
            task.order_index,
            task.category_id,
            id,
            owner.get(),
        ],
    )
    .map_err(|e| duplicate_or_storage(e, "task", &task.title))?;
    get_task(conn, owner, id)
}

pub fn update_task(conn: &Connection, owner: OwnerId, id: i64, patch: &TaskPatch) -> Result<Task> {
    let patch = validate_patch(conn, owner, patch)?;
    let task = write_patch(conn, owner, id, &patch)?;
    log::debug!("owner {owner}: updated task {id}");
    Ok(task)
}

pub fn toggle_task(conn: &Connection, owner: OwnerId, id: i64) -> Result<Task> {
    let rows = conn.execute(TOGGLE_TASK, rusqlite::params![id, owner.get()])?;
    if rows == 0 {
        return Err(Error::task_not_found(id));
    }
    get_task(conn, owner, id)
}

pub fn remove_task(conn: &Connection, owner: OwnerId, id: i64) -> Result<()> {
    let rows = conn.execute(
        "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
        rusqlite::params![id, owner.get()],
    )?;
    if rows == 0 {
        return Err(Error::task_not_found(id));
    }
    log::info!("owner {owner}: removed task {id}");
    Ok(())
}

/// Apply one patch to every listed task, all or nothing.
pub fn bulk_update(
    conn: &Connection,
    owner: OwnerId,
    ids: &[i64],
    patch: &TaskPatch,
) -> Result<Vec<Task>> {
    check_batch(ids)?;
    if patch.is_empty() {
        return Err(Error::invalid("updates", "at least one field must be changed"));
    }
    let patch = validate_patch(conn, owner, patch)?;
    let tasks = with_savepoint(conn, "bulk_update", || {
        ids.iter()
            .map(|&id| write_patch(conn, owner, id, &patch))
            .collect::<Result<Vec<_>>>()
    })?;
    log::info!("owner {owner}: bulk-updated {} tasks", tasks.len());
    Ok(tasks)
}

pub fn bulk_toggle(conn: &Connection, owner: OwnerId, ids: &[i64]) -> Result<Vec<Task>> {
    check_batch(ids)?;
    let tasks = with_savepoint(conn, "bulk_toggle", || {
        ids.iter()
            .map(|&id| toggle_task(conn, owner, id))
            .collect::<Result<Vec<_>>>()
    })?;
    log::info!("owner {owner}: bulk-toggled {} tasks", tasks.len());
    Ok(tasks)
}

pub fn bulk_delete(conn: &Connection, owner: OwnerId, ids: &[i64]) -> Result<usize> {
    check_batch(ids)?;
    with_savepoint(conn, "bulk_delete", || {
        for &id in ids {
            remove_task(conn, owner, id)?;
        }
        Ok(())
    })?;
    Ok(ids.len())
}

pub fn add_category(
    conn: &Connection,
    owner: OwnerId,
    name: &str,
    description: Option<&str>,
    color: Option<&str>,
) -> Result<Category> {
    let name = validate_category_name(name)?;
    let color = color.unwrap_or(DEFAULT_CATEGORY_COLOR);
    validate_color(color)?;
    conn.execute(
        "INSERT INTO categories (owner_id, name, description, color) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![owner.get(), name, description, color],
    )
    .map_err(|e| duplicate_or_storage(e, "category", &name))?;
    let id = conn.last_insert_rowid();
    let query = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1");
    Ok(conn.query_row(&query, [id], read_category_row)?)
}

pub fn list_categories(conn: &Connection, owner: OwnerId) -> Result<Vec<Category>> {
    let query =
        format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE owner_id = ?1 ORDER BY name, id");
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map([owner.get()], read_category_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

/// Delete a category. Its tasks survive with no category.
pub fn remove_category(conn: &Connection, owner: OwnerId, id: i64) -> Result<()> {
    let rows = conn.execute(
        "DELETE FROM categories WHERE id = ?1 AND owner_id = ?2",
        rusqlite::params![id, owner.get()],
    )?;
    if rows == 0 {
        return Err(Error::category_not_found(id));
    }
    Ok(())
}
