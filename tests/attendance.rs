use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use mountains_db::attendance::{enroll, set_waiting_list, withdraw, AttendanceChange, Enrollment};
use mountains_db::db::{Db, Filter};
use mountains_db::events::{create_event, delete_event, edit_event, EventDraft};
use mountains_db::models::{Activity, Attendee, AttendeeKey, Event, EventType, User};
use mountains_db::users::{register_user, Registration};
use mountains_db::Config;

fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

fn members(db: &Db, count: usize) -> anyhow::Result<Vec<User>> {
    let mut users = Vec::with_capacity(count);
    for i in 0..count {
        users.push(register_user(
            db,
            Registration::new(format!("walker{i}@example.com"), "hash", "Walker", format!("{i}")),
        )?);
    }
    Ok(users)
}

fn walk(db: &Db, organizer: &User, max_attendees: Option<i64>) -> anyhow::Result<Event> {
    let start = NaiveDate::from_ymd_opt(2025, 8, 16)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("bad date"))?;
    let mut draft = EventDraft::new("Helvellyn via Striding Edge", start, EventType::SummerDayWalk);
    draft.max_attendees = max_attendees;
    Ok(create_event(db, draft, organizer)?)
}

fn attendee(db: &Db, event: &Event, user: &User) -> anyhow::Result<Option<Attendee>> {
    let key = AttendeeKey {
        user_id: user.id,
        event_id: event.id,
    };
    Ok(db.read(|s| s.get_by_key::<Attendee>(&key))?)
}

#[test]
fn capacity_two_scenario() -> anyhow::Result<()> {
    init_logging();
    let db = Db::open_memory()?;
    db.setup()?;
    let users = members(&db, 4)?;
    let (organizer, a, b, c) = (&users[0], &users[1], &users[2], &users[3]);
    let event = walk(&db, organizer, Some(2))?;

    let placed: Vec<bool> = [a, b, c]
        .iter()
        .map(|member| -> anyhow::Result<bool> {
            let enrollment = enroll(&db, &event, member.id, member)?;
            let attendee = enrollment
                .into_attendee()
                .ok_or_else(|| anyhow::anyhow!("expected a new attendee"))?;
            Ok(attendee.is_waiting_list)
        })
        .collect::<anyhow::Result<_>>()?;
    assert_eq!(placed, vec![false, false, true]);

    withdraw(&db, event.id, b.id, b)?;
    assert!(attendee(&db, &event, b)?.is_none());
    let waiting = attendee(&db, &event, c)?.ok_or_else(|| anyhow::anyhow!("c missing"))?;
    assert!(waiting.is_waiting_list, "withdrawal must not promote anyone");

    let promoted = set_waiting_list(&db, event.id, c.id, false, organizer)?;
    assert!(!promoted.is_waiting_list);
    assert_eq!(attendee(&db, &event, c)?, Some(promoted));

    let actions: Vec<String> = db
        .read(|s| mountains_db::activity::for_event(s, event.id))?
        .into_iter()
        .map(|a| a.action)
        .collect();
    for expected in [
        "created event",
        "joined",
        "joined waiting list for",
        "left",
        "was moved by Walker 0 to attending for",
    ] {
        assert!(actions.iter().any(|a| a == expected), "missing {expected:?}");
    }
    Ok(())
}

#[test]
fn enroll_reads_event_under_the_lock() -> anyhow::Result<()> {
    init_logging();
    let db = Db::open_memory()?;
    db.setup()?;
    let users = members(&db, 3)?;
    let stale = walk(&db, &users[0], Some(1))?;

    let mut draft = EventDraft::new(stale.title.clone(), stale.event_dt, stale.event_type);
    draft.max_attendees = Some(10);
    edit_event(&db, stale.id, draft, &users[0])?;

    enroll(&db, &stale, users[1].id, &users[1])?;
    let second = enroll(&db, &stale, users[2].id, &users[2])?;
    assert_eq!(second.attendee().map(|a| a.is_waiting_list), Some(false));

    delete_event(&db, stale.id, &users[0])?;
    let err = enroll(&db, &stale, users[0].id, &users[0]).unwrap_err();
    assert!(err.is_not_found());
    assert!(attendee(&db, &stale, &users[0])?.is_none());
    Ok(())
}

#[test]
fn change_listener_runs_after_commit() -> anyhow::Result<()> {
    init_logging();
    let db = Db::open_memory()?;
    db.setup()?;
    let users = members(&db, 2)?;
    let event = walk(&db, &users[0], None)?;

    let (tx, rx) = std::sync::mpsc::channel();
    db.on_change(move |change| {
        let _ = tx.send(change);
    })?;
    enroll(&db, &event, users[1].id, &users[0])?;

    let change = rx.recv_timeout(Duration::from_secs(1))?;
    assert_eq!(
        change,
        AttendanceChange::Enrolled {
            event_id: event.id,
            user_id: users[1].id,
            waiting_list: false,
        }
    );
    Ok(())
}

#[test]
fn waitlist_is_sticky() -> anyhow::Result<()> {
    init_logging();
    let db = Db::open_memory()?;
    db.setup()?;
    let users = members(&db, 4)?;
    let event = walk(&db, &users[0], Some(3))?;

    enroll(&db, &event, users[1].id, &users[1])?;
    enroll(&db, &event, users[2].id, &users[2])?;
    set_waiting_list(&db, event.id, users[2].id, true, &users[0])?;

    let late = enroll(&db, &event, users[3].id, &users[3])?;
    assert_eq!(late.attendee().map(|a| a.is_waiting_list), Some(true));
    Ok(())
}

#[test]
fn unlimited_capacity_never_waitlists() -> anyhow::Result<()> {
    init_logging();
    let db = Db::open_memory()?;
    db.setup()?;
    let users = members(&db, 12)?;
    for max in [None, Some(0)] {
        let event = walk(&db, &users[0], max)?;
        for user in &users {
            let enrollment = enroll(&db, &event, user.id, &users[0])?;
            assert_eq!(enrollment.attendee().map(|a| a.is_waiting_list), Some(false));
        }
    }
    Ok(())
}

#[test]
fn duplicate_enroll_leaves_one_row() -> anyhow::Result<()> {
    init_logging();
    let db = Db::open_memory()?;
    db.setup()?;
    let users = members(&db, 1)?;
    let event = walk(&db, &users[0], Some(1))?;

    enroll(&db, &event, users[0].id, &users[0])?;
    assert_eq!(
        enroll(&db, &event, users[0].id, &users[0])?,
        Enrollment::AlreadyEnrolled
    );
    let rows = db.read(|s| s.count_where::<Attendee>(&Filter::by("event_id", event.id)))?;
    assert_eq!(rows, 1);
    Ok(())
}

#[test]
fn failed_activity_write_rolls_back_enrollment() -> anyhow::Result<()> {
    init_logging();
    let db = Db::open_memory()?;
    db.setup()?;
    let users = members(&db, 1)?;
    let event = walk(&db, &users[0], None)?;

    db.read(|s| s.drop_table::<Activity>())?;
    assert!(enroll(&db, &event, users[0].id, &users[0]).is_err());
    assert!(attendee(&db, &event, &users[0])?.is_none());
    Ok(())
}

#[test]
fn concurrent_enrollments_respect_capacity() -> anyhow::Result<()> {
    init_logging();
    const CAPACITY: usize = 5;
    const EXTRA: usize = 5;

    let dir = tempfile::tempdir()?;
    let config = Config {
        db_path: dir.path().join("club.db"),
        pool_size: (CAPACITY + EXTRA + 1) as u32,
        busy_timeout: Duration::from_secs(30),
        ..Config::default()
    };
    let db = Db::with_config(&config)?;
    db.setup()?;
    let users = members(&db, CAPACITY + EXTRA)?;
    let event = walk(&db, &users[0], Some(CAPACITY as i64))?;

    let barrier = Arc::new(Barrier::new(users.len()));
    let handles: Vec<_> = users
        .into_iter()
        .map(|user| {
            let db = db.clone();
            let event = event.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                enroll(&db, &event, user.id, &user)
            })
        })
        .collect();

    let mut waiting = 0;
    let mut active = 0;
    for handle in handles {
        let enrollment = handle
            .join()
            .map_err(|_| anyhow::anyhow!("enroll thread panicked"))??;
        match enrollment.attendee() {
            Some(a) if a.is_waiting_list => waiting += 1,
            Some(_) => active += 1,
            None => anyhow::bail!("unexpected no-op enrollment"),
        }
    }
    assert_eq!((active, waiting), (CAPACITY, EXTRA));

    let stored = db.read(|s| s.list_where::<Attendee>(&Filter::by("event_id", event.id)))?;
    assert_eq!(stored.iter().filter(|a| a.is_waiting_list).count(), EXTRA);
    assert_eq!(stored.len(), CAPACITY + EXTRA);
    Ok(())
}
