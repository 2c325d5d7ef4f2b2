//! Organizer-side event lifecycle: create, edit, soft delete, and the
//! listings built on top of the store.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::activity;
use crate::clock::now_utc;
use crate::db::{Changes, Db, Filter, Scope};
use crate::error::{Error, Result};
use crate::models::{Event, EventType, User};
use crate::slug::readable_id;

/// The organizer-editable part of an event.
#[derive(Clone, Debug, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub event_dt: NaiveDateTime,
    pub event_end_dt: Option<NaiveDateTime>,
    pub event_type: EventType,
    pub signup_open_dt: Option<NaiveDateTime>,
    pub max_attendees: Option<i64>,
    pub show_participation_ice: bool,
    pub is_members_only: bool,
    pub is_draft: bool,
    pub is_locked: bool,
    pub price_id: Option<String>,
}

impl EventDraft {
    pub fn new(title: impl Into<String>, event_dt: NaiveDateTime, event_type: EventType) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            event_dt,
            event_end_dt: None,
            event_type,
            signup_open_dt: None,
            max_attendees: None,
            show_participation_ice: false,
            is_members_only: false,
            is_draft: false,
            is_locked: false,
            price_id: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("Title must not be blank!".to_owned()));
        }
        if self.event_end_dt.is_some_and(|end| end < self.event_dt) {
            return Err(Error::Validation(
                "Provided end date must be later than the start date!".to_owned(),
            ));
        }
        if self.max_attendees.is_some_and(|max| max < 0) {
            return Err(Error::Validation(
                "Maximum attendees must not be negative!".to_owned(),
            ));
        }
        Ok(())
    }

    fn into_event(self, id: i64, created_on_utc: NaiveDateTime, is_deleted: bool) -> Event {
        let slug = readable_id(&[
            self.event_dt.format("%Y-%m-%d").to_string(),
            self.title.clone(),
            id.to_string(),
        ]);
        Event {
            id,
            slug,
            title: self.title,
            description: self.description,
            event_dt: self.event_dt,
            event_end_dt: self.event_end_dt,
            event_type: self.event_type,
            created_on_utc,
            updated_on_utc: now_utc(),
            signup_open_dt: self.signup_open_dt,
            max_attendees: self.max_attendees,
            show_participation_ice: self.show_participation_ice,
            is_members_only: self.is_members_only,
            is_draft: self.is_draft,
            is_deleted,
            is_locked: self.is_locked,
            price_id: self.price_id,
        }
    }
}

pub fn create_event(db: &Db, draft: EventDraft, actor: &User) -> Result<Event> {
    draft.validate()?;
    let event = db.write(|tx| {
        let id = tx.next_id::<Event>()?;
        let event = draft.into_event(id, now_utc(), false);
        tx.insert(&event)?;
        activity::record(tx, Some(actor.id), Some(event.id), "created event")?;
        Ok(event)
    })?;

    log::info!("Event {} created by user {}", event.slug, actor.id);
    Ok(event)
}

/// Replaces the event's row with one rebuilt from `draft`. The creation
/// time and deleted flag carry over; attendees and activity still point at
/// the same id.
pub fn edit_event(db: &Db, id: i64, draft: EventDraft, actor: &User) -> Result<Event> {
    draft.validate()?;
    let event = db.write(|tx| {
        let existing = tx.get_by_key_or_404::<Event>(&id)?;
        let event = draft.into_event(id, existing.created_on_utc, existing.is_deleted);

        tx.defer_foreign_keys()?;
        tx.delete_by_key::<Event>(&id)?;
        tx.insert(&event)?;
        activity::record(tx, Some(actor.id), Some(id), "edited event")?;
        Ok(event)
    })?;

    log::info!("Event {} edited by user {}", event.slug, actor.id);
    Ok(event)
}

/// Marks the event deleted. The row, its attendees and its activity stay.
pub fn delete_event(db: &Db, id: i64, actor: &User) -> Result<()> {
    db.write(|tx| {
        let changed = tx.update_by_key::<Event>(&id, &Changes::new().set("is_deleted", true))?;
        if changed == 0 {
            return Err(Error::NotFound { table: "events" });
        }
        activity::record(tx, Some(actor.id), Some(id), "deleted event")
    })?;

    log::info!("Event {} deleted by user {}", id, actor.id);
    Ok(())
}

#[derive(Clone, Debug, Default)]
pub struct EventQuery {
    /// `None` matches every type.
    pub event_types: Option<HashSet<EventType>>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
}

impl EventQuery {
    fn matches(&self, event: &Event) -> bool {
        if let Some(types) = &self.event_types {
            if !types.contains(&event.event_type) {
                return false;
            }
        }
        match &self.search {
            Some(search) if !search.is_empty() => {
                event.title.to_lowercase().contains(&search.to_lowercase())
            }
            _ => true,
        }
    }
}

/// Non-deleted events matching `query`: upcoming ones soonest first, then
/// past ones most recent first.
pub fn list_events(scope: &Scope, query: &EventQuery, today: NaiveDate) -> Result<Vec<Event>> {
    let (mut upcoming, mut past): (Vec<Event>, Vec<Event>) = scope
        .list_where::<Event>(&Filter::by("is_deleted", false))?
        .into_iter()
        .filter(|e| query.matches(e))
        .partition(|e| e.is_upcoming_on(today));

    upcoming.sort_by_key(|e| e.event_dt);
    past.sort_by(|a, b| b.event_dt.cmp(&a.event_dt));
    upcoming.extend(past);
    Ok(upcoming)
}

/// Non-deleted events that start or end within `[start, end]`, by start.
pub fn events_between(
    scope: &Scope,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<Event>> {
    let within = |dt: NaiveDateTime| dt >= start && dt <= end;
    let mut events: Vec<Event> = scope
        .list_where::<Event>(&Filter::by("is_deleted", false))?
        .into_iter()
        .filter(|e| within(e.event_dt) || e.event_end_dt.is_some_and(within))
        .collect();
    events.sort_by_key(|e| e.event_dt);
    Ok(events)
}

/// The whole weeks covering a month: from the Monday on or before the 1st
/// to midnight of the Sunday on or after the last day.
pub fn calendar_window(year: i32, month: u32) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let invalid = || Error::Validation(format!("{year}-{month} is not a valid month"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;

    let last = next_first - Duration::days(1);
    let start = first - Duration::days(i64::from(first.weekday().num_days_from_monday()));
    let end = last + Duration::days(6 - i64::from(last.weekday().num_days_from_monday()));
    Ok((start.and_time(chrono::NaiveTime::MIN), end.and_time(chrono::NaiveTime::MIN)))
}
