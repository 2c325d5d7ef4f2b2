use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use mountains_db::db::{Changes, Db, Filter};
use mountains_db::events::{create_event, EventDraft};
use mountains_db::models::{Attendee, Event, EventType, KitGroup, KitItem};
use mountains_db::users::{register_user, Registration};
use mountains_db::{Config, Error};

fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

fn open() -> anyhow::Result<Db> {
    init_logging();
    let db = Db::open_memory()?;
    db.setup()?;
    Ok(db)
}

fn helmet(id: i64, size: &str) -> KitItem {
    KitItem {
        id,
        club_id: format!("H{id:03}"),
        description: "Climbing helmet".to_owned(),
        brand: Some("Petzl".to_owned()),
        color: Some("orange".to_owned()),
        size: Some(size.to_owned()),
        kit_group: KitGroup::Helmets,
        kit_type: None,
        purchased_on: NaiveDate::from_ymd_opt(2022, 3, 14).unwrap(),
        purchase_price: 54.99,
    }
}

#[test]
fn insert_then_get_round_trips() -> anyhow::Result<()> {
    let db = open()?;
    let item = helmet(1, "M");
    db.write(|tx| tx.insert(&item))?;

    let stored = db.read(|s| s.get_by_key::<KitItem>(&1))?;
    assert_eq!(stored, Some(item));
    assert_eq!(db.read(|s| s.get_by_key::<KitItem>(&2))?, None);
    assert!(db
        .read(|s| s.get_by_key_or_404::<KitItem>(&2))
        .unwrap_err()
        .is_not_found());
    Ok(())
}

#[test]
fn update_touches_only_named_columns() -> anyhow::Result<()> {
    let db = open()?;
    db.write(|tx| {
        tx.insert(&helmet(1, "S"))?;
        tx.insert(&helmet(2, "L"))
    })?;

    let changed = db.write(|tx| {
        tx.update_by_key::<KitItem>(&2, &Changes::new().set("color", "white").set("size", "XL"))
    })?;
    assert_eq!(changed, 1);

    let items = db.read(|s| s.list::<KitItem>())?;
    let first = items.iter().find(|i| i.id == 1).ok_or_else(|| anyhow::anyhow!("missing 1"))?;
    let second = items.iter().find(|i| i.id == 2).ok_or_else(|| anyhow::anyhow!("missing 2"))?;
    assert_eq!(first.color.as_deref(), Some("orange"));
    assert_eq!(second.color.as_deref(), Some("white"));
    assert_eq!(second.size.as_deref(), Some("XL"));
    assert_eq!(second.brand.as_deref(), Some("Petzl"));
    Ok(())
}

#[test]
fn delete_where_and_membership_filters() -> anyhow::Result<()> {
    let db = open()?;
    db.write(|tx| {
        for id in 1..=4 {
            tx.insert(&helmet(id, "M"))?;
        }
        Ok(())
    })?;

    let some = db.read(|s| s.list_where::<KitItem>(&Filter::new().any_of("id", [1_i64, 3])))?;
    assert_eq!(some.len(), 2);

    let removed = db.write(|tx| tx.delete_where::<KitItem>(&Filter::new().any_of("id", [2_i64, 4])))?;
    assert_eq!(removed, 2);
    let mut left: Vec<i64> = db.read(|s| s.list::<KitItem>())?.into_iter().map(|i| i.id).collect();
    left.sort();
    assert_eq!(left, vec![1, 3]);
    Ok(())
}

#[test]
fn unknown_columns_fail_before_sql() -> anyhow::Result<()> {
    let db = open()?;
    let err = db
        .read(|s| s.list_where::<KitItem>(&Filter::by("colour", "red")))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownField { field: "colour", .. }));

    let err = db
        .write(|tx| tx.update_where::<KitItem>(&Filter::new(), &Changes::new()))
        .unwrap_err();
    assert!(matches!(err, Error::EmptyUpdate { .. }));
    Ok(())
}

#[test]
fn constraint_violations_are_reported() -> anyhow::Result<()> {
    let db = open()?;
    let user = register_user(&db, Registration::new("rock@example.com", "h", "Rock", "Hopper"))?;

    let err = db
        .write(|tx| tx.insert(&Attendee::new(user.id, 404, false)))
        .unwrap_err();
    assert!(err.is_constraint_violation(), "{err}");

    let err = db
        .write(|tx| {
            tx.insert(&helmet(1, "M"))?;
            tx.insert(&helmet(1, "L"))
        })
        .unwrap_err();
    assert!(err.is_constraint_violation(), "{err}");
    assert!(db.read(|s| s.list::<KitItem>())?.is_empty());
    Ok(())
}

#[test]
fn drop_and_recreate_table() -> anyhow::Result<()> {
    let db = open()?;
    db.write(|tx| tx.insert(&helmet(1, "M")))?;
    db.read(|s| {
        s.drop_table::<KitItem>()?;
        s.drop_table::<KitItem>()?;
        s.create_table::<KitItem>()?;
        s.create_table::<KitItem>()
    })?;
    assert!(db.read(|s| s.list::<KitItem>())?.is_empty());
    Ok(())
}

#[test]
fn undecodable_rows_report_the_statement() -> anyhow::Result<()> {
    let db = open()?;
    let user = register_user(&db, Registration::new("map@example.com", "h", "Map", "Reader"))?;
    let start = NaiveDate::from_ymd_opt(2025, 9, 1)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("bad date"))?;
    let event = create_event(&db, EventDraft::new("Navigation", start, EventType::Other), &user)?;

    db.write(|tx| {
        tx.update_by_key::<Event>(&event.id, &Changes::new().set("event_type", 42_i64))
    })?;

    let err = db.read(|s| s.list::<Event>()).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }), "{err:?}");
    assert!(err.to_string().contains("SELECT"), "{err}");
    assert!(err.to_string().contains("FROM events"), "{err}");
    Ok(())
}

#[test]
fn blocked_writer_times_out() -> anyhow::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("club.db");
    let holder = Db::with_config(&Config {
        db_path: path.clone(),
        pool_size: 1,
        ..Config::default()
    })?;
    holder.setup()?;
    let impatient = Db::with_config(&Config {
        db_path: path,
        pool_size: 1,
        busy_timeout: Duration::from_millis(50),
        ..Config::default()
    })?;

    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let writer = thread::spawn(move || {
        holder.write(|tx| {
            tx.insert(&helmet(1, "M"))?;
            let _ = locked_tx.send(());
            let _ = release_rx.recv_timeout(Duration::from_secs(5));
            Ok(())
        })
    });

    locked_rx.recv_timeout(Duration::from_secs(5))?;
    let err = impatient.write(|tx| tx.insert(&helmet(2, "L"))).unwrap_err();
    release_tx.send(())?;
    writer
        .join()
        .map_err(|_| anyhow::anyhow!("writer thread panicked"))??;

    match err {
        Error::LockTimeout { statement } => assert_eq!(statement, "BEGIN IMMEDIATE"),
        other => anyhow::bail!("expected LockTimeout, got {other:?}"),
    }
    assert_eq!(impatient.read(|s| s.list::<KitItem>())?.len(), 1);
    Ok(())
}
