use chrono::{Duration, TimeZone, Utc};
use rusqlite::Connection;

use taskdeck::filter::{PrioritySelector, TaskFilter};
use taskdeck::model::{NewTask, OwnerId, TaskPatch};
use taskdeck::query::{Page, Sort, SortField, SortOrder};
use taskdeck::{db, ops, order, query, stats, Error};

fn open(dir: &tempfile::TempDir) -> Connection {
    let path = dir.path().join("taskdeck.db");
    let conn = db::open(path.to_str().unwrap()).unwrap();
    db::init(&conn).unwrap();
    conn
}

fn alice() -> OwnerId {
    OwnerId::new(1)
}

fn bob() -> OwnerId {
    OwnerId::new(2)
}

fn titles(conn: &Connection, owner: OwnerId) -> Vec<String> {
    query::list_tasks(conn, owner, &TaskFilter::default(), Sort::default(), Page::default())
        .unwrap()
        .tasks
        .into_iter()
        .map(|t| t.title)
        .collect()
}

fn indices(conn: &Connection, owner: OwnerId) -> Vec<(i64, f64)> {
    order::ordered(conn, owner)
        .unwrap()
        .into_iter()
        .map(|t| (t.id, t.order_index))
        .collect()
}

#[test]
fn listing_follows_order_index_not_creation() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open(&dir);
    for (title, index) in [("third", 30.0), ("first", 10.0), ("second", 20.0)] {
        ops::add_task(
            &conn,
            alice(),
            &NewTask {
                order_index: Some(index),
                ..NewTask::titled(title)
            },
        )
        .unwrap();
    }
    assert_eq!(titles(&conn, alice()), vec!["first", "second", "third"]);
}

#[test]
fn sequence_then_drop_between() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open(&dir);
    let a = ops::add_task(&conn, alice(), &NewTask::titled("a")).unwrap();
    let b = ops::add_task(&conn, alice(), &NewTask::titled("b")).unwrap();
    let c = ops::add_task(&conn, alice(), &NewTask::titled("c")).unwrap();

    let sequenced = order::bulk_sequence(&conn, alice(), &[c.id, a.id, b.id]).unwrap();
    let positions: Vec<f64> = sequenced.iter().map(|t| t.order_index).collect();
    assert_eq!(positions, vec![1000.0, 2000.0, 3000.0]);
    assert_eq!(titles(&conn, alice()), vec!["c", "a", "b"]);

    order::reindex(&conn, alice(), b.id, 1500.0).unwrap();
    assert_eq!(titles(&conn, alice()), vec!["c", "b", "a"]);
}

#[test]
fn new_tasks_append_after_the_last() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open(&dir);
    let a = ops::add_task(&conn, alice(), &NewTask::titled("a")).unwrap();
    order::reindex(&conn, alice(), a.id, 5000.0).unwrap();
    let b = ops::add_task(&conn, alice(), &NewTask::titled("b")).unwrap();
    assert!(b.order_index > 5000.0);
    let c = ops::add_task(&conn, alice(), &NewTask::titled("c")).unwrap();
    assert!(c.order_index > b.order_index);
}

#[test]
fn failed_sequence_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open(&dir);
    let a = ops::add_task(&conn, alice(), &NewTask::titled("a")).unwrap();
    let b = ops::add_task(&conn, alice(), &NewTask::titled("b")).unwrap();
    let theirs = ops::add_task(&conn, bob(), &NewTask::titled("theirs")).unwrap();
    let before = indices(&conn, alice());

    let err = order::bulk_sequence(&conn, alice(), &[b.id, 999, a.id]).unwrap_err();
    assert!(matches!(err, Error::NotFound { id: 999, .. }));
    assert_eq!(indices(&conn, alice()), before);

    let err = order::bulk_sequence(&conn, alice(), &[b.id, theirs.id]).unwrap_err();
    assert!(matches!(err, Error::NotFound { id, .. } if id == theirs.id));
    assert_eq!(indices(&conn, alice()), before);
    assert_eq!(ops::get_task(&conn, bob(), theirs.id).unwrap().order_index, theirs.order_index);
}

#[test]
fn other_owners_tasks_are_invisible() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open(&dir);
    let theirs = ops::add_task(&conn, bob(), &NewTask::titled("secret")).unwrap();
    ops::add_task(&conn, alice(), &NewTask::titled("mine")).unwrap();

    assert!(matches!(
        ops::get_task(&conn, alice(), theirs.id),
        Err(Error::NotFound { .. })
    ));
    assert!(ops::toggle_task(&conn, alice(), theirs.id).is_err());
    assert!(ops::remove_task(&conn, alice(), theirs.id).is_err());
    assert!(order::reindex(&conn, alice(), theirs.id, 1.0).is_err());
    assert!(ops::bulk_delete(&conn, alice(), &[theirs.id]).is_err());

    let search = TaskFilter {
        search: Some("secret".into()),
        ..TaskFilter::default()
    };
    let page =
        query::list_tasks(&conn, alice(), &search, Sort::default(), Page::default()).unwrap();
    assert_eq!(page.total, 0);

    let s = stats::stats(&conn, alice(), &Utc::now(), 7).unwrap();
    assert_eq!(s.total, 1);
    assert!(!ops::get_task(&conn, bob(), theirs.id).unwrap().completed);
}

#[test]
fn same_title_allowed_for_different_owners() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open(&dir);
    ops::add_task(&conn, alice(), &NewTask::titled("groceries")).unwrap();
    ops::add_task(&conn, bob(), &NewTask::titled("groceries")).unwrap();
    let err = ops::add_task(&conn, alice(), &NewTask::titled("  groceries ")).unwrap_err();
    assert!(matches!(err, Error::Duplicate { .. }));
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let conn = open(&dir);
        let work = ops::add_category(&conn, alice(), "Work", None, None).unwrap();
        ops::add_task(
            &conn,
            alice(),
            &NewTask {
                description: Some("quarterly numbers".into()),
                priority: Some(2),
                due_date: Some(Utc.with_ymd_and_hms(2030, 1, 31, 17, 0, 0).unwrap()),
                category_id: Some(work.id),
                ..NewTask::titled("report")
            },
        )
        .unwrap()
        .id
    };
    let conn = open(&dir);
    let task = ops::get_task(&conn, alice(), id).unwrap();
    assert_eq!(task.title, "report");
    assert_eq!(task.priority, 2);
    assert_eq!(
        task.due_date,
        Some(Utc.with_ymd_and_hms(2030, 1, 31, 17, 0, 0).unwrap())
    );
    assert!(task.category_id.is_some());
}

#[test]
fn bulk_update_then_filtered_sorted_page() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open(&dir);
    let now = Utc::now();
    let mut ids = Vec::new();
    for i in 0..6u8 {
        let task = ops::add_task(
            &conn,
            alice(),
            &NewTask {
                priority: Some(i + 1),
                due_date: Some(now + Duration::days(i64::from(i) + 1)),
                ..NewTask::titled(format!("task {i}"))
            },
        )
        .unwrap();
        ids.push(task.id);
    }

    let patch = TaskPatch {
        completed: Some(true),
        ..TaskPatch::default()
    };
    ops::bulk_update(&conn, alice(), &ids[..2], &patch).unwrap();

    // Pending tasks in the high band (priorities 1..=3) leave only "task 2".
    let filter = TaskFilter {
        completed: Some(false),
        priority: Some(PrioritySelector::from_value(1)),
        ..TaskFilter::default()
    };
    let page =
        query::list_tasks(&conn, alice(), &filter, Sort::default(), Page::default()).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.tasks[0].title, "task 2");

    let sort = Sort::new(SortField::DueDate, SortOrder::Desc);
    let page = query::pending(&conn, alice(), Page::new(0, 2)).unwrap();
    assert_eq!(page.total, 4);
    let latest = query::list_tasks(&conn, alice(), &TaskFilter::default(), sort, Page::new(1, 2))
        .unwrap();
    let got: Vec<&str> = latest.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(got, vec!["task 4", "task 3"]);
    assert_eq!(latest.total, 6);
}

#[test]
fn removing_a_category_keeps_its_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open(&dir);
    let home = ops::add_category(&conn, alice(), "Home", None, Some("#10B981")).unwrap();
    let task = ops::add_task(
        &conn,
        alice(),
        &NewTask {
            category_id: Some(home.id),
            ..NewTask::titled("vacuum")
        },
    )
    .unwrap();
    ops::remove_category(&conn, alice(), home.id).unwrap();
    assert_eq!(ops::get_task(&conn, alice(), task.id).unwrap().category_id, None);
}
