use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::clock::now_utc;
use crate::db::{Column, Record};

/// One line of the audit trail, e.g. "<user> joined <event>". Append only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub user_id: Option<i64>,
    pub event_id: Option<i64>,
    pub action: String,
    pub dt: NaiveDateTime,
}

impl Activity {
    pub fn new(user_id: Option<i64>, event_id: Option<i64>, action: impl Into<String>) -> Self {
        Self {
            user_id,
            event_id,
            action: action.into(),
            dt: now_utc(),
        }
    }
}

impl Record for Activity {
    const TABLE: &'static str = "activity";
    const COLUMNS: &'static [Column] = &[
        Column::new(
            "user_id",
            "INTEGER REFERENCES users(id) ON DELETE SET NULL ON UPDATE CASCADE",
        ),
        Column::new("event_id", "INTEGER REFERENCES events(id) ON UPDATE CASCADE"),
        Column::new("action", "TEXT NOT NULL"),
        Column::new("dt", "DATETIME NOT NULL"),
    ];
}
