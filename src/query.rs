//! Execution of task predicates: sort, paginate, count.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::Serialize;

use crate::db;
use crate::error::Result;
use crate::filter::{AdvancedSearch, Predicate, TaskFilter};
use crate::model::{OwnerId, Task};
use crate::ops::{read_task_row, TASK_COLUMNS};

pub const DEFAULT_LIMIT: u64 = 100;
pub const DEFAULT_HIGH_PRIORITY_THRESHOLD: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Title,
    Priority,
    DueDate,
    CreatedAt,
    #[default]
    OrderIndex,
}

impl SortField {
    /// Unrecognised names fall back to the manual order.
    pub fn parse(s: &str) -> Self {
        match s {
            "title" => Self::Title,
            "priority" => Self::Priority,
            "due_date" => Self::DueDate,
            "created_at" => Self::CreatedAt,
            _ => Self::OrderIndex,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Priority => "priority",
            Self::DueDate => "due_date",
            Self::CreatedAt => "created_at",
            Self::OrderIndex => "order_index",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything other than `desc` (any case) sorts ascending.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Sort {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// ORDER BY body. Ties always break by id ascending; tasks without a due
    /// date go last when sorting by due date.
    fn order_by(self) -> String {
        let dir = self.order.keyword();
        match self.field {
            SortField::DueDate => format!("due_date IS NULL, due_date {dir}, id ASC"),
            field => format!("{} {dir}, id ASC", field.column()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u64,
    pub limit: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    pub fn new(skip: u64, limit: u64) -> Self {
        Self { skip, limit }
    }

    /// 1-based page number for display.
    pub fn number(self) -> u64 {
        if self.limit == 0 {
            1
        } else {
            self.skip / self.limit + 1
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    /// Matching rows before pagination.
    pub total: u64,
    pub page: u64,
    pub size: u64,
}

fn to_sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

pub fn count(conn: &Connection, predicate: &Predicate) -> Result<u64> {
    let query = format!("SELECT COUNT(*) FROM tasks WHERE {}", predicate.where_sql());
    let n: i64 = conn.query_row(
        &query,
        rusqlite::params_from_iter(predicate.params()),
        |row| row.get(0),
    )?;
    Ok(n.max(0) as u64)
}

/// Count and fetch one page. Both reads share a savepoint so `total` agrees
/// with the rows returned.
pub fn list(conn: &Connection, predicate: &Predicate, sort: Sort, page: Page) -> Result<TaskPage> {
    let query = format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
        predicate.where_sql(),
        sort.order_by(),
    );
    log::trace!("owner {}: {query}", predicate.owner());
    db::with_savepoint(conn, "list_tasks", || {
        let total = count(conn, predicate)?;
        let params = predicate.params().iter().cloned().chain([
            Value::Integer(to_sql_int(page.limit)),
            Value::Integer(to_sql_int(page.skip)),
        ]);
        let mut stmt = conn.prepare(&query)?;
        let tasks = stmt
            .query_map(rusqlite::params_from_iter(params), read_task_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(TaskPage {
            tasks,
            total,
            page: page.number(),
            size: page.limit,
        })
    })
}

/// The main listing: filter, sort, paginate.
pub fn list_tasks(
    conn: &Connection,
    owner: OwnerId,
    filter: &TaskFilter,
    sort: Sort,
    page: Page,
) -> Result<TaskPage> {
    list(conn, &Predicate::from_filter(owner, filter), sort, page)
}

/// Multi-criteria search. A malformed priority range is rejected before any
/// query runs.
pub fn search(
    conn: &Connection,
    owner: OwnerId,
    criteria: &AdvancedSearch,
    sort: Sort,
    page: Page,
) -> Result<TaskPage> {
    let predicate = Predicate::from_search(owner, criteria)?;
    list(conn, &predicate, sort, page)
}

pub fn overdue(conn: &Connection, owner: OwnerId, now: &DateTime<Utc>, page: Page) -> Result<TaskPage> {
    list(conn, &Predicate::owned_by(owner).overdue(now), Sort::default(), page)
}

pub fn due_today(conn: &Connection, owner: OwnerId, now: &DateTime<Utc>, page: Page) -> Result<TaskPage> {
    list(conn, &Predicate::owned_by(owner).due_today(now), Sort::default(), page)
}

pub fn high_priority(conn: &Connection, owner: OwnerId, threshold: u8, page: Page) -> Result<TaskPage> {
    list(
        conn,
        &Predicate::owned_by(owner).priority_at_least(threshold),
        Sort::default(),
        page,
    )
}

pub fn completed(conn: &Connection, owner: OwnerId, page: Page) -> Result<TaskPage> {
    list(conn, &Predicate::owned_by(owner).completed(true), Sort::default(), page)
}

pub fn pending(conn: &Connection, owner: OwnerId, page: Page) -> Result<TaskPage> {
    list(conn, &Predicate::owned_by(owner).completed(false), Sort::default(), page)
}
