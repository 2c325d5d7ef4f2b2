use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::clock::now_utc;
use crate::db::{Allocated, Column, Filter, Keyed, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum EventType {
    SummerDayWalk,
    SummerWeekend,
    WinterDayWalk,
    WinterWeekend,
    IndoorClimbing,
    OutdoorClimbing,
    Running,
    Social,
    Committee,
    Other,
}

integer_code!(EventType {
    SummerDayWalk = 1,
    SummerWeekend = 2,
    WinterDayWalk = 3,
    WinterWeekend = 4,
    IndoorClimbing = 5,
    OutdoorClimbing = 6,
    Running = 7,
    Social = 8,
    Committee = 9,
    Other = 10,
});

impl EventType {
    pub const ALL: [EventType; 10] = [
        EventType::SummerDayWalk,
        EventType::SummerWeekend,
        EventType::WinterDayWalk,
        EventType::WinterWeekend,
        EventType::IndoorClimbing,
        EventType::OutdoorClimbing,
        EventType::Running,
        EventType::Social,
        EventType::Committee,
        EventType::Other,
    ];

    /// Event types that count against a non-member's trial allowance.
    pub fn counts_towards_trial(self) -> bool {
        matches!(
            self,
            EventType::SummerDayWalk
                | EventType::SummerWeekend
                | EventType::WinterDayWalk
                | EventType::WinterWeekend
                | EventType::OutdoorClimbing
                | EventType::Running
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub event_dt: NaiveDateTime,
    pub event_end_dt: Option<NaiveDateTime>,
    pub event_type: EventType,
    pub created_on_utc: NaiveDateTime,
    pub updated_on_utc: NaiveDateTime,
    pub signup_open_dt: Option<NaiveDateTime>,
    /// `None` and `Some(0)` both mean unlimited.
    pub max_attendees: Option<i64>,
    pub show_participation_ice: bool,
    pub is_members_only: bool,
    pub is_draft: bool,
    pub is_deleted: bool,
    pub is_locked: bool,
    pub price_id: Option<String>,
}

impl Event {
    /// Starts on or after `day`, or is still running on it.
    pub fn is_upcoming_on(&self, day: NaiveDate) -> bool {
        self.event_dt.date() >= day || self.event_end_dt.is_some_and(|end| end.date() >= day)
    }

    pub fn is_upcoming(&self) -> bool {
        self.is_upcoming_on(now_utc().date())
    }

    pub fn is_happening_on(&self, day: NaiveDate) -> bool {
        match self.event_end_dt {
            None => self.event_dt.date() == day,
            Some(end) => self.event_dt.date() <= day && end.date() >= day,
        }
    }

    pub fn is_part_of_trial(&self) -> bool {
        self.event_type.counts_towards_trial()
    }
}

impl Record for Event {
    const TABLE: &'static str = "events";
    const COLUMNS: &'static [Column] = &[
        Column::new("id", "INTEGER PRIMARY KEY"),
        Column::new("slug", "TEXT UNIQUE"),
        Column::new("title", "TEXT NOT NULL"),
        Column::new("description", "TEXT NOT NULL"),
        Column::new("event_dt", "DATETIME NOT NULL"),
        Column::new("event_end_dt", "DATETIME"),
        Column::new("event_type", "INTEGER NOT NULL"),
        Column::new("created_on_utc", "DATETIME NOT NULL"),
        Column::new("updated_on_utc", "DATETIME NOT NULL"),
        Column::new("signup_open_dt", "DATETIME"),
        Column::new("max_attendees", "INTEGER"),
        Column::new("show_participation_ice", "BOOLEAN NOT NULL"),
        Column::new("is_members_only", "BOOLEAN NOT NULL DEFAULT false"),
        Column::new("is_draft", "BOOLEAN NOT NULL DEFAULT false"),
        Column::new("is_deleted", "BOOLEAN NOT NULL DEFAULT false"),
        Column::new("is_locked", "BOOLEAN NOT NULL DEFAULT false"),
        Column::new("price_id", "TEXT"),
    ];
}

impl Keyed for Event {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }

    fn key_filter(key: &i64) -> Filter {
        Filter::by("id", *key)
    }
}

impl Allocated for Event {}

/// One member's place on one event. Rows are only ever written by the
/// attendance protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub user_id: i64,
    pub event_id: i64,
    pub joined_at_utc: NaiveDateTime,
    pub is_waiting_list: bool,
    pub is_trip_paid: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttendeeKey {
    pub user_id: i64,
    pub event_id: i64,
}

impl Attendee {
    pub fn new(user_id: i64, event_id: i64, is_waiting_list: bool) -> Self {
        Self {
            user_id,
            event_id,
            joined_at_utc: now_utc(),
            is_waiting_list,
            is_trip_paid: false,
        }
    }
}

impl Record for Attendee {
    const TABLE: &'static str = "attendees";
    const COLUMNS: &'static [Column] = &[
        Column::new("user_id", "INTEGER NOT NULL"),
        Column::new("event_id", "INTEGER NOT NULL"),
        Column::new("joined_at_utc", "DATETIME NOT NULL"),
        Column::new("is_waiting_list", "BOOLEAN NOT NULL DEFAULT false"),
        Column::new("is_trip_paid", "BOOLEAN NOT NULL DEFAULT false"),
    ];
    const CONSTRAINTS: &'static [&'static str] = &[
        "PRIMARY KEY (user_id, event_id)",
        "FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE",
        "FOREIGN KEY (event_id) REFERENCES events(id) ON UPDATE CASCADE",
    ];
}

impl Keyed for Attendee {
    type Key = AttendeeKey;

    fn key(&self) -> AttendeeKey {
        AttendeeKey {
            user_id: self.user_id,
            event_id: self.event_id,
        }
    }

    fn key_filter(key: &AttendeeKey) -> Filter {
        Filter::by("user_id", key.user_id).eq("event_id", key.event_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{Attendee, Event, EventType};
    use crate::db::Record;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn event(start: NaiveDateTime, end: Option<NaiveDateTime>) -> Event {
        Event {
            id: 1,
            slug: "walk".to_owned(),
            title: "Walk".to_owned(),
            description: String::new(),
            event_dt: start,
            event_end_dt: end,
            event_type: EventType::SummerWeekend,
            created_on_utc: start,
            updated_on_utc: start,
            signup_open_dt: None,
            max_attendees: None,
            show_participation_ice: false,
            is_members_only: false,
            is_draft: false,
            is_deleted: false,
            is_locked: false,
            price_id: None,
        }
    }

    #[test]
    fn fields_match_columns() {
        event(at(2025, 6, 1), None).check_fields().unwrap();
        Attendee::new(1, 1, false).check_fields().unwrap();
    }

    #[test]
    fn multi_day_events_stay_upcoming_until_they_end() {
        let weekend = event(at(2025, 6, 6), Some(at(2025, 6, 8)));
        let sunday = NaiveDate::from_ymd_opt(2025, 6, 8).unwrap();
        assert!(weekend.is_upcoming_on(sunday));
        assert!(weekend.is_happening_on(sunday));
        assert!(!weekend.is_upcoming_on(sunday.succ_opt().unwrap()));
    }

    #[test]
    fn single_day_events_happen_on_their_start_date() {
        let walk = event(at(2025, 6, 1), None);
        assert!(walk.is_happening_on(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()));
        assert!(!walk.is_happening_on(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()));
    }

    #[test]
    fn event_type_codes_round_trip() {
        for kind in EventType::ALL {
            assert_eq!(EventType::try_from(i64::from(kind)), Ok(kind));
        }
        assert!(EventType::try_from(42_i64).is_err());
        assert!(!EventType::Social.counts_towards_trial());
        assert!(EventType::Running.counts_towards_trial());
    }
}
