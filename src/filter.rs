//! Translation of filter criteria into a SQL predicate over `tasks`.
//!
//! A [`Predicate`] is a list of `AND`ed clauses with positional parameters.
//! The first clause is always the owner restriction and there is no way to
//! build a predicate without an [`OwnerId`], so every query that runs through
//! the executor is scoped to exactly one owner. Building a predicate never
//! touches storage.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;

use crate::db::timestamp;
use crate::error::{Error, Result};
use crate::model::{OwnerId, PriorityBand, MAX_PRIORITY, MIN_PRIORITY};

/// Search tokens shorter than this (in characters) are dropped.
pub const MIN_TOKEN_CHARS: usize = 2;

/// The single-value priority filter. Three sentinel values select a whole
/// band; every other value is an exact match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrioritySelector {
    Band(PriorityBand),
    Exact(i64),
}

impl PrioritySelector {
    /// 1 selects the high band, 4 the medium band, 8 the low band.
    pub fn from_value(value: i64) -> Self {
        match value {
            1 => Self::Band(PriorityBand::High),
            4 => Self::Band(PriorityBand::Medium),
            8 => Self::Band(PriorityBand::Low),
            other => Self::Exact(other),
        }
    }
}

/// Criteria accepted by the main task listing.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub search: Option<String>,
    pub completed: Option<bool>,
    pub category_id: Option<i64>,
    pub priority: Option<PrioritySelector>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
}

/// Multi-criteria search. Unlike [`TaskFilter`] the priority criterion is a
/// plain inclusive interval without band semantics.
#[derive(Debug, Clone, Default)]
pub struct AdvancedSearch {
    pub query: Option<String>,
    pub priority_min: Option<u8>,
    pub priority_max: Option<u8>,
    pub category_ids: Vec<i64>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
}

impl AdvancedSearch {
    /// Resolve the priority interval. A missing bound takes the extreme of
    /// the scale; `None` means no priority criterion at all.
    pub fn priority_range(&self) -> Result<Option<(u8, u8)>> {
        if self.priority_min.is_none() && self.priority_max.is_none() {
            return Ok(None);
        }
        let min = self.priority_min.unwrap_or(MIN_PRIORITY);
        let max = self.priority_max.unwrap_or(MAX_PRIORITY);
        for (bound, value) in [("minimum", min), ("maximum", max)] {
            if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&value) {
                return Err(Error::invalid(
                    "priority_range",
                    format!("{bound} {value} is outside {MIN_PRIORITY}..={MAX_PRIORITY}"),
                ));
            }
        }
        if min > max {
            return Err(Error::invalid(
                "priority_range",
                format!("minimum {min} is greater than maximum {max}"),
            ));
        }
        Ok(Some((min, max)))
    }
}

/// Split a free-text query into lower-cased keywords, dropping the ones too
/// short to be useful.
pub fn search_tokens(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
        .collect()
}

#[derive(Debug, Clone)]
pub struct Predicate {
    owner: OwnerId,
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Predicate {
    pub fn owned_by(owner: OwnerId) -> Self {
        Self {
            owner,
            clauses: vec!["owner_id = ?".to_string()],
            params: vec![Value::Integer(owner.get())],
        }
    }

    pub fn from_filter(owner: OwnerId, filter: &TaskFilter) -> Self {
        let mut p = Self::owned_by(owner);
        if let Some(query) = &filter.search {
            p = p.text(query);
        }
        if let Some(completed) = filter.completed {
            p = p.completed(completed);
        }
        if let Some(category_id) = filter.category_id {
            p = p.category(category_id);
        }
        if let Some(selector) = filter.priority {
            p = p.priority(selector);
        }
        if let Some(from) = &filter.due_from {
            p = p.due_from(from);
        }
        if let Some(to) = &filter.due_to {
            p = p.due_to(to);
        }
        p
    }

    /// Fails with a validation error when the priority interval is
    /// malformed; no predicate is produced in that case.
    pub fn from_search(owner: OwnerId, search: &AdvancedSearch) -> Result<Self> {
        let range = search.priority_range()?;
        let mut p = Self::owned_by(owner);
        if let Some(query) = &search.query {
            p = p.text(query);
        }
        if let Some((min, max)) = range {
            p = p.priority_between(min, max);
        }
        if !search.category_ids.is_empty() {
            p = p.categories(&search.category_ids);
        }
        if let Some(from) = &search.due_from {
            p = p.due_from(from);
        }
        if let Some(to) = &search.due_to {
            p = p.due_to(to);
        }
        if let Some(completed) = search.completed {
            p = p.completed(completed);
        }
        Ok(p)
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    fn push(mut self, clause: impl Into<String>, params: impl IntoIterator<Item = Value>) -> Self {
        self.clauses.push(clause.into());
        self.params.extend(params);
        self
    }

    /// Keyword search: any token appearing in the title or the description
    /// is enough. With no usable tokens nothing matches.
    pub fn text(self, query: &str) -> Self {
        let tokens = search_tokens(query);
        if tokens.is_empty() {
            return self.matches_nothing();
        }
        let per_token = "(instr(casefold(title), ?) > 0 \
                         OR instr(casefold(coalesce(description, '')), ?) > 0)";
        let clause = format!("({})", vec![per_token; tokens.len()].join(" OR "));
        let params: Vec<Value> = tokens
            .into_iter()
            .flat_map(|t| [Value::Text(t.clone()), Value::Text(t)])
            .collect();
        self.push(clause, params)
    }

    pub fn matches_nothing(self) -> Self {
        self.push("0", [])
    }

    pub fn completed(self, completed: bool) -> Self {
        self.push("completed = ?", [Value::Integer(i64::from(completed))])
    }

    pub fn category(self, category_id: i64) -> Self {
        self.push("category_id = ?", [Value::Integer(category_id)])
    }

    pub fn categories(self, category_ids: &[i64]) -> Self {
        if category_ids.is_empty() {
            return self.matches_nothing();
        }
        let marks = vec!["?"; category_ids.len()].join(", ");
        self.push(
            format!("category_id IN ({marks})"),
            category_ids.iter().map(|&id| Value::Integer(id)),
        )
    }

    pub fn priority(self, selector: PrioritySelector) -> Self {
        match selector {
            PrioritySelector::Band(band) => {
                let (min, max) = band.bounds();
                self.priority_between(min, max)
            }
            PrioritySelector::Exact(value) => {
                self.push("priority = ?", [Value::Integer(value)])
            }
        }
    }

    pub fn priority_between(self, min: u8, max: u8) -> Self {
        self.push(
            "priority BETWEEN ? AND ?",
            [Value::Integer(min.into()), Value::Integer(max.into())],
        )
    }

    pub fn priority_at_least(self, threshold: u8) -> Self {
        self.push("priority >= ?", [Value::Integer(threshold.into())])
    }

    /// Inclusive lower due-date bound. Tasks without a due date never match.
    pub fn due_from(self, from: &DateTime<Utc>) -> Self {
        self.push("due_date >= ?", [Value::Text(timestamp(from))])
    }

    /// Inclusive upper due-date bound.
    pub fn due_to(self, to: &DateTime<Utc>) -> Self {
        self.push("due_date <= ?", [Value::Text(timestamp(to))])
    }

    pub fn due_before(self, instant: &DateTime<Utc>) -> Self {
        self.push("due_date < ?", [Value::Text(timestamp(instant))])
    }

    /// Due at any time during the given UTC calendar day.
    pub fn due_on(self, day: NaiveDate) -> Self {
        self.push(
            "substr(due_date, 1, 10) = ?",
            [Value::Text(day.format("%Y-%m-%d").to_string())],
        )
    }

    /// Not completed and due strictly before `now`.
    pub fn overdue(self, now: &DateTime<Utc>) -> Self {
        self.due_before(now).completed(false)
    }

    /// Not completed and due on `now`'s UTC calendar day.
    pub fn due_today(self, now: &DateTime<Utc>) -> Self {
        self.due_on(now.date_naive()).completed(false)
    }

    pub(crate) fn where_sql(&self) -> String {
        self.clauses.join(" AND ")
    }

    pub(crate) fn params(&self) -> &[Value] {
        &self.params
    }
}
