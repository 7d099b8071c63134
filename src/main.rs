mod cli;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use rusqlite::Connection;

use cli::{CategoryCommand, Cli, Command, PageArgs, PatchArgs, SortArgs};
use taskdeck::config::Config;
use taskdeck::filter::{AdvancedSearch, PrioritySelector, TaskFilter};
use taskdeck::model::{NewTask, OwnerId, TaskPatch};
use taskdeck::query::{Page, Sort, SortField, SortOrder, TaskPage};
use taskdeck::{db, ops, order, output, paths, query, stats};

fn open_db(db_path: &str) -> Result<Connection> {
    paths::ensure_parent_dir(db_path)
        .with_context(|| format!("failed to create directory for {db_path}"))?;
    let conn = db::open(db_path)?;
    db::init(&conn)?;
    Ok(conn)
}

fn require_owner(user: Option<i64>) -> Result<OwnerId> {
    user.map(OwnerId::new)
        .context("no user given: pass --user or set TASKDECK_USER")
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD`. A bare date means the start of
/// that UTC day, or its last microsecond when `end_of_day` is set.
fn parse_date(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}': expected YYYY-MM-DD or RFC 3339"))?;
    let time = if end_of_day {
        NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .context("invalid time of day")?;
    Ok(day.and_time(time).and_utc())
}

fn parse_opt_date(raw: Option<&str>, end_of_day: bool) -> Result<Option<DateTime<Utc>>> {
    raw.map(|r| parse_date(r, end_of_day)).transpose()
}

fn build_patch(args: PatchArgs) -> Result<TaskPatch> {
    let description = match (args.desc, args.clear_desc) {
        (_, true) => Some(None),
        (Some(d), false) => Some(Some(d)),
        (None, false) => None,
    };
    let due_date = if args.clear_due {
        Some(None)
    } else {
        parse_opt_date(args.due.as_deref(), false)?.map(Some)
    };
    let category_id = match (args.category, args.clear_category) {
        (_, true) => Some(None),
        (Some(id), false) => Some(Some(id)),
        (None, false) => None,
    };
    let patch = TaskPatch {
        title: args.title,
        description,
        completed: args.completed,
        priority: args.priority,
        due_date,
        category_id,
        order_index: args.order_index,
    };
    if patch.is_empty() {
        bail!("nothing to change");
    }
    Ok(patch)
}

fn sort_of(args: &SortArgs) -> Sort {
    Sort::new(SortField::parse(&args.sort), SortOrder::parse(&args.order))
}

fn page_of(config: &Config, args: &PageArgs) -> Result<Page> {
    Ok(Page::new(args.skip, config.page_limit(args.limit)?))
}

fn print_page(page: &TaskPage, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(page)?);
    } else {
        print!("{}", output::format_task_page(page));
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(paths::db_path);
    let config = match &cli.config {
        Some(path) => Config::load_from(std::path::Path::new(path))?,
        None => Config::load()?,
    };
    let conn = open_db(&db_path)?;

    if let Command::Init = cli.command {
        eprintln!("Initialized {db_path}");
        return Ok(());
    }
    let owner = require_owner(cli.user)?;
    let now = Utc::now();

    match cli.command {
        Command::Init => {}

        Command::Add {
            title,
            desc,
            priority,
            due,
            category,
            order_index,
        } => {
            let new = NewTask {
                title,
                description: desc,
                priority,
                due_date: parse_opt_date(due.as_deref(), false)?,
                category_id: category,
                order_index,
            };
            let task = ops::add_task(&conn, owner, &new)?;
            println!("{}", task.id);
            eprintln!("Added task {} '{}'", task.id, task.title);
        }

        Command::Show { id, json } => {
            let task = ops::get_task(&conn, owner, id)?;
            let categories = ops::list_categories(&conn, owner)?;
            let category = task
                .category_id
                .and_then(|cid| categories.iter().find(|c| c.id == cid));
            if json {
                let detail = output::TaskDetail::new(&task, category);
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                print!("{}", output::format_task_detail(&task, category));
            }
        }

        Command::Edit { id, patch } => {
            let task = ops::update_task(&conn, owner, id, &build_patch(patch)?)?;
            eprintln!("Updated task {} '{}'", task.id, task.title);
        }

        Command::Toggle { id } => {
            let task = ops::toggle_task(&conn, owner, id)?;
            let state = if task.completed { "completed" } else { "pending" };
            eprintln!("Marked task {id} as {state}");
        }

        Command::Rm { id } => {
            ops::remove_task(&conn, owner, id)?;
            eprintln!("Removed task {id}");
        }

        Command::List {
            search,
            completed,
            category,
            priority,
            from,
            to,
            sort,
            page,
        } => {
            let filter = TaskFilter {
                search,
                completed,
                category_id: category,
                priority: priority.map(PrioritySelector::from_value),
                due_from: parse_opt_date(from.as_deref(), false)?,
                due_to: parse_opt_date(to.as_deref(), true)?,
            };
            let result =
                query::list_tasks(&conn, owner, &filter, sort_of(&sort), page_of(&config, &page)?)?;
            print_page(&result, page.json)?;
        }

        Command::Search {
            query: text,
            min_priority,
            max_priority,
            categories,
            completed,
            from,
            to,
            sort,
            page,
        } => {
            let criteria = AdvancedSearch {
                query: text,
                priority_min: min_priority,
                priority_max: max_priority,
                category_ids: categories,
                due_from: parse_opt_date(from.as_deref(), false)?,
                due_to: parse_opt_date(to.as_deref(), true)?,
                completed,
            };
            let result =
                query::search(&conn, owner, &criteria, sort_of(&sort), page_of(&config, &page)?)?;
            print_page(&result, page.json)?;
        }

        Command::Overdue { page } => {
            let result = query::overdue(&conn, owner, &now, page_of(&config, &page)?)?;
            print_page(&result, page.json)?;
        }

        Command::DueToday { page } => {
            let result = query::due_today(&conn, owner, &now, page_of(&config, &page)?)?;
            print_page(&result, page.json)?;
        }

        Command::HighPriority { threshold, page } => {
            let threshold = threshold.unwrap_or(config.stats.high_priority_threshold);
            let result = query::high_priority(&conn, owner, threshold, page_of(&config, &page)?)?;
            print_page(&result, page.json)?;
        }

        Command::Completed { page } => {
            let result = query::completed(&conn, owner, page_of(&config, &page)?)?;
            print_page(&result, page.json)?;
        }

        Command::Pending { page } => {
            let result = query::pending(&conn, owner, page_of(&config, &page)?)?;
            print_page(&result, page.json)?;
        }

        Command::Reorder { id, index } => {
            let task = order::reindex(&conn, owner, id, index)?;
            eprintln!("Moved task {id} to {}", task.order_index);
        }

        Command::Move { id, after, before } => {
            if after.is_none() && before.is_none() {
                bail!("give --after, --before, or both");
            }
            let task = order::move_between(&conn, owner, id, after, before)?;
            eprintln!("Moved task {id} to {}", task.order_index);
        }

        Command::Sequence { ids } => {
            let tasks = order::bulk_sequence(&conn, owner, &ids)?;
            eprintln!("Sequenced {} tasks", tasks.len());
        }

        Command::Compact => {
            let n = order::compact(&conn, owner)?;
            eprintln!("Renumbered {n} tasks");
        }

        Command::Stats { threshold, json } => {
            let threshold = threshold.unwrap_or(config.stats.high_priority_threshold);
            let s = stats::stats(&conn, owner, &now, threshold)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&s)?);
            } else {
                print!("{}", output::format_stats(&s));
            }
        }

        Command::BulkUpdate { ids, patch } => {
            let tasks = ops::bulk_update(&conn, owner, &ids, &build_patch(patch)?)?;
            eprintln!("Updated {} tasks", tasks.len());
        }

        Command::BulkToggle { ids } => {
            let tasks = ops::bulk_toggle(&conn, owner, &ids)?;
            eprintln!("Toggled {} tasks", tasks.len());
        }

        Command::BulkDelete { ids } => {
            let n = ops::bulk_delete(&conn, owner, &ids)?;
            eprintln!("Removed {n} tasks");
        }

        Command::Category(cmd) => match cmd {
            CategoryCommand::Add { name, desc, color } => {
                let category =
                    ops::add_category(&conn, owner, &name, desc.as_deref(), color.as_deref())?;
                println!("{}", category.id);
                eprintln!("Added category {} '{}'", category.id, category.name);
            }
            CategoryCommand::List { json } => {
                let categories = ops::list_categories(&conn, owner)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&categories)?);
                } else {
                    print!("{}", output::format_categories(&categories));
                }
            }
            CategoryCommand::Rm { id } => {
                ops::remove_category(&conn, owner, id)?;
                eprintln!("Removed category {id}");
            }
        },
    }

    Ok(())
}
