//! Enrolling members on events, with a waiting list once an event is full.
//!
//! Every mutation here reads the event's current attendees and writes a
//! consequence of what it saw, so it runs inside one `Db::write` scope from
//! the read to the last write. Committed changes are then published through
//! `Db::subscribe` for anything slow (email, chat) that must not run under
//! the lock.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::activity;
use crate::db::{Changes, Db, Exclusive, Filter, Record, Scope};
use crate::error::{Error, Result};
use crate::models::{Attendee, AttendeeKey, Event, User};

/// Published after an attendance mutation commits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttendanceChange {
    Enrolled {
        event_id: i64,
        user_id: i64,
        waiting_list: bool,
    },
    Withdrawn {
        event_id: i64,
        user_id: i64,
    },
    WaitingListChanged {
        event_id: i64,
        user_id: i64,
        waiting_list: bool,
    },
    PaidChanged {
        event_id: i64,
        user_id: i64,
        paid: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Enrollment {
    Added(Attendee),
    /// The member already had a row for the event; nothing was written.
    AlreadyEnrolled,
}

impl Enrollment {
    pub fn attendee(&self) -> Option<&Attendee> {
        match self {
            Enrollment::Added(attendee) => Some(attendee),
            Enrollment::AlreadyEnrolled => None,
        }
    }

    pub fn into_attendee(self) -> Option<Attendee> {
        match self {
            Enrollment::Added(attendee) => Some(attendee),
            Enrollment::AlreadyEnrolled => None,
        }
    }
}

/// Something a member is asked to confirm before signing up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Prompt {
    MembersOnly,
    EmergencyContact,
    ParticipationStatement,
    TrialExceeded,
}

/// Full once anyone is waiting, so later sign-ups queue behind them even
/// if an active place has been freed. Otherwise full when the active
/// attendees reach a positive capacity.
pub fn is_full(event: &Event, attendees: &[Attendee]) -> bool {
    if attendees.iter().any(|a| a.is_waiting_list) {
        return true;
    }

    match event.max_attendees {
        None | Some(0) => false,
        Some(max) => {
            let active = attendees.iter().filter(|a| !a.is_waiting_list).count();
            i64::try_from(active).map_or(true, |active| active >= max)
        }
    }
}

pub fn is_open(event: &Event, now: NaiveDateTime) -> bool {
    event.signup_open_dt.map_or(true, |opens| opens <= now)
}

pub fn needs_payment(event: &Event, attendee: &Attendee) -> bool {
    event.price_id.is_some() && !attendee.is_waiting_list && !attendee.is_trip_paid
}

/// Adds `member_id` to the event, on the waiting list if the event is full.
/// `actor` is whoever asked: the member themself or an organizer.
pub fn enroll(db: &Db, event: &Event, member_id: i64, actor: &User) -> Result<Enrollment> {
    let enrollment = db.write(|tx| enroll_within(tx, event, member_id, actor))?;
    if let Enrollment::Added(attendee) = &enrollment {
        db.publish(AttendanceChange::Enrolled {
            event_id: attendee.event_id,
            user_id: attendee.user_id,
            waiting_list: attendee.is_waiting_list,
        });
    }
    Ok(enrollment)
}

/// `enroll` inside a write scope the caller already holds. Capacity is
/// judged against the event row as it stands under the lock, so only
/// `event.id` is taken from the argument. A soft-deleted event is
/// `Error::NotFound`.
pub fn enroll_within(
    tx: &Exclusive,
    event: &Event,
    member_id: i64,
    actor: &User,
) -> Result<Enrollment> {
    let event = tx.get_by_key_or_404::<Event>(&event.id)?;
    if event.is_deleted {
        return Err(Error::NotFound { table: Event::TABLE });
    }

    let attendees = tx.list_where::<Attendee>(&Filter::by("event_id", event.id))?;
    if attendees.iter().any(|a| a.user_id == member_id) {
        log::warn!(
            "Attempt to add already existing user {} to event {}, ignoring...",
            member_id,
            event.slug
        );
        return Ok(Enrollment::AlreadyEnrolled);
    }

    let attendee = Attendee::new(member_id, event.id, is_full(&event, &attendees));
    tx.insert(&attendee)?;

    let list = if attendee.is_waiting_list {
        "waiting list"
    } else {
        "attending"
    };
    let action = if actor.id == member_id {
        if attendee.is_waiting_list {
            "joined waiting list for".to_owned()
        } else {
            "joined".to_owned()
        }
    } else {
        format!("was added by {} to {} for", actor.full_name(), list)
    };
    activity::record(tx, Some(member_id), Some(event.id), action)?;

    log::info!(
        "User {} added to event {} ({})",
        member_id,
        event.slug,
        list
    );
    Ok(Enrollment::Added(attendee))
}

/// Removes the member from the event. Nobody is promoted off the waiting
/// list; that is left to an organizer via `set_waiting_list`.
pub fn withdraw(db: &Db, event_id: i64, member_id: i64, actor: &User) -> Result<()> {
    db.write(|tx| {
        let key = AttendeeKey {
            user_id: member_id,
            event_id,
        };
        tx.get_by_key_or_404::<Attendee>(&key)?;
        tx.delete_by_key::<Attendee>(&key)?;

        let action = if actor.id == member_id {
            "left".to_owned()
        } else {
            format!("was removed by {} from", actor.full_name())
        };
        activity::record(tx, Some(member_id), Some(event_id), action)
    })?;

    log::info!("User {} removed from event {}", member_id, event_id);
    db.publish(AttendanceChange::Withdrawn {
        event_id,
        user_id: member_id,
    });
    Ok(())
}

/// Moves an attendee onto or off the waiting list by hand.
pub fn set_waiting_list(
    db: &Db,
    event_id: i64,
    member_id: i64,
    waiting_list: bool,
    actor: &User,
) -> Result<Attendee> {
    let key = AttendeeKey {
        user_id: member_id,
        event_id,
    };
    let attendee = db.write(|tx| {
        tx.get_by_key_or_404::<Attendee>(&key)?;
        tx.update_by_key::<Attendee>(&key, &Changes::new().set("is_waiting_list", waiting_list))?;

        let list = if waiting_list {
            "waiting list"
        } else {
            "attending"
        };
        let action = format!("was moved by {} to {} for", actor.full_name(), list);
        activity::record(tx, Some(member_id), Some(event_id), action)?;

        tx.get_by_key_or_404::<Attendee>(&key)
    })?;

    db.publish(AttendanceChange::WaitingListChanged {
        event_id,
        user_id: member_id,
        waiting_list,
    });
    Ok(attendee)
}

pub fn set_paid(db: &Db, event_id: i64, member_id: i64, paid: bool) -> Result<Attendee> {
    let key = AttendeeKey {
        user_id: member_id,
        event_id,
    };
    let attendee = db.write(|tx| {
        tx.get_by_key_or_404::<Attendee>(&key)?;
        tx.update_by_key::<Attendee>(&key, &Changes::new().set("is_trip_paid", paid))?;
        tx.get_by_key_or_404::<Attendee>(&key)
    })?;

    db.publish(AttendanceChange::PaidChanged {
        event_id,
        user_id: member_id,
        paid,
    });
    Ok(attendee)
}

/// Past events of a trial type that the member attended (not waiting).
pub fn trial_events_attended(scope: &Scope, member_id: i64, today: NaiveDate) -> Result<Vec<Event>> {
    let attending = scope.list_where::<Attendee>(
        &Filter::by("user_id", member_id).eq("is_waiting_list", false),
    )?;
    let ids: HashSet<i64> = attending.iter().map(|a| a.event_id).collect();
    let events = scope.list_where::<Event>(&Filter::new().any_of("id", ids))?;
    Ok(events
        .into_iter()
        .filter(|e| !e.is_upcoming_on(today) && e.is_part_of_trial())
        .collect())
}

/// What the member must confirm before signing up for `event`, in the
/// order it should be asked. A non-member over their trial allowance gets
/// only `TrialExceeded`. Advisory: `enroll` does not check these.
pub fn eligibility_prompts(
    scope: &Scope,
    event: &Event,
    member: &User,
    today: NaiveDate,
    max_trial_events: usize,
) -> Result<Vec<Prompt>> {
    let past_trial_events = if member.is_member_on(today) {
        0
    } else {
        trial_events_attended(scope, member.id, today)?.len()
    };
    Ok(prompts_for(event, member, today, past_trial_events, max_trial_events))
}

pub fn prompts_for(
    event: &Event,
    member: &User,
    today: NaiveDate,
    past_trial_events: usize,
    max_trial_events: usize,
) -> Vec<Prompt> {
    let is_member = member.is_member_on(today);
    if !is_member && past_trial_events > max_trial_events {
        return vec![Prompt::TrialExceeded];
    }

    let mut prompts = Vec::new();
    if event.is_members_only && !is_member {
        prompts.push(Prompt::MembersOnly);
    }
    if event.show_participation_ice || member.in_case_emergency.is_empty() {
        prompts.push(Prompt::EmergencyContact);
    }
    if event.show_participation_ice {
        prompts.push(Prompt::ParticipationStatement);
    }
    prompts
}
