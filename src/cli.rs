use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "taskdeck", about = "Multi-user task list")]
pub struct Cli {
    /// Path to the SQLite database [default: ~/.taskdeck/taskdeck.db]
    #[arg(long, env = "TASKDECK_DB", global = true)]
    pub db: Option<String>,

    /// Id of the user whose tasks are read and written
    #[arg(long, env = "TASKDECK_USER", global = true)]
    pub user: Option<i64>,

    /// Path to the config file [default: ~/.taskdeck/config.toml]
    #[arg(long, env = "TASKDECK_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct PageArgs {
    /// Rows to skip before the first one shown
    #[arg(long, default_value = "0")]
    pub skip: u64,
    /// Rows per page [default: list.default_limit from config]
    #[arg(long)]
    pub limit: Option<u64>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct SortArgs {
    /// Sort field (title, priority, due_date, created_at, order_index)
    #[arg(long, default_value = "order_index")]
    pub sort: String,
    /// Sort direction (asc, desc)
    #[arg(long, default_value = "asc")]
    pub order: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create database and tables (idempotent)
    Init,

    /// Add a task
    Add {
        /// Task title
        title: String,
        /// Task description
        #[arg(short, long)]
        desc: Option<String>,
        /// Priority 1 (most urgent) to 10
        #[arg(short, long)]
        priority: Option<u8>,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,
        /// Category id
        #[arg(short, long)]
        category: Option<i64>,
        /// Explicit list position [default: after the last task]
        #[arg(long, allow_hyphen_values = true)]
        order_index: Option<f64>,
    },

    /// Show task details
    Show {
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit a task
    Edit {
        id: i64,
        #[command(flatten)]
        patch: PatchArgs,
    },

    /// Flip a task between pending and completed
    Toggle { id: i64 },

    /// Remove a task
    Rm { id: i64 },

    /// List tasks
    List {
        /// Keywords matched against title and description (any keyword)
        #[arg(short, long)]
        search: Option<String>,
        /// Only completed (true) or pending (false) tasks
        #[arg(long)]
        completed: Option<bool>,
        /// Category id
        #[arg(short, long)]
        category: Option<i64>,
        /// Priority; 1, 4 and 8 select the high, medium and low bands
        #[arg(short, long)]
        priority: Option<i64>,
        /// Earliest due date (inclusive)
        #[arg(long)]
        from: Option<String>,
        /// Latest due date (inclusive; a bare date covers the whole day)
        #[arg(long)]
        to: Option<String>,
        #[command(flatten)]
        sort: SortArgs,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Search tasks by several criteria at once
    Search {
        /// Keywords matched against title and description (any keyword)
        query: Option<String>,
        /// Lowest priority value (inclusive)
        #[arg(long)]
        min_priority: Option<u8>,
        /// Highest priority value (inclusive)
        #[arg(long)]
        max_priority: Option<u8>,
        /// Category id (repeatable)
        #[arg(short, long = "category")]
        categories: Vec<i64>,
        #[arg(long)]
        completed: Option<bool>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[command(flatten)]
        sort: SortArgs,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Pending tasks whose due date has passed
    Overdue {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Pending tasks due today (UTC)
    DueToday {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Tasks at or above a priority value
    HighPriority {
        /// [default: stats.high_priority_threshold from config]
        #[arg(long)]
        threshold: Option<u8>,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Completed tasks
    Completed {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Pending tasks
    Pending {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Set a task's list position
    Reorder {
        id: i64,
        #[arg(allow_hyphen_values = true)]
        index: f64,
    },

    /// Move a task between two neighbours
    Move {
        id: i64,
        /// Place directly after this task
        #[arg(long)]
        after: Option<i64>,
        /// Place directly before this task
        #[arg(long)]
        before: Option<i64>,
    },

    /// Renumber tasks 1000, 2000, ... in the given order
    Sequence {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Renumber the whole list with even gaps, keeping its order
    Compact,

    /// Summary counts
    Stats {
        /// [default: stats.high_priority_threshold from config]
        #[arg(long)]
        threshold: Option<u8>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply the same edit to several tasks
    BulkUpdate {
        /// Comma-separated task ids
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i64>,
        #[command(flatten)]
        patch: PatchArgs,
    },

    /// Toggle several tasks
    BulkToggle {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Remove several tasks
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Manage categories
    #[command(subcommand)]
    Category(CategoryCommand),
}

#[derive(Args)]
pub struct PatchArgs {
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New description
    #[arg(short, long, conflicts_with = "clear_desc")]
    pub desc: Option<String>,
    /// Remove the description
    #[arg(long)]
    pub clear_desc: bool,
    #[arg(long)]
    pub completed: Option<bool>,
    #[arg(short, long)]
    pub priority: Option<u8>,
    /// New due date (YYYY-MM-DD or RFC 3339)
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<String>,
    /// Remove the due date
    #[arg(long)]
    pub clear_due: bool,
    /// New category id
    #[arg(short, long, conflicts_with = "clear_category")]
    pub category: Option<i64>,
    /// Remove the category
    #[arg(long)]
    pub clear_category: bool,
    #[arg(long, allow_hyphen_values = true)]
    pub order_index: Option<f64>,
}

#[derive(Subcommand)]
pub enum CategoryCommand {
    /// Add a category
    Add {
        name: String,
        #[arg(short, long)]
        desc: Option<String>,
        /// Colour as #RRGGBB
        #[arg(long)]
        color: Option<String>,
    },
    /// List categories
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a category; its tasks become uncategorised
    Rm { id: i64 },
}
