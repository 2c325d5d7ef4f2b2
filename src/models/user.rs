use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::db::{Allocated, Column, Filter, Keyed, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum CommitteeRole {
    Chair,
    ViceChair,
    Treasurer,
    Secretary,
    General,
}

integer_code!(CommitteeRole {
    Chair = 1,
    ViceChair = 2,
    Treasurer = 3,
    Secretary = 4,
    General = 10,
});

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub slug: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub about: Option<String>,
    pub mobile: String,
    pub in_case_emergency: String,
    pub profile_picture_url: Option<String>,
    pub is_admin: bool,
    pub is_committee: bool,
    pub is_coordinator: bool,
    pub is_winter_skills: bool,
    pub discord_id: Option<String>,
    pub membership_expiry: Option<NaiveDate>,
    pub is_dormant: bool,
    pub committee_role: Option<CommitteeRole>,
    pub committee_bio: String,
    pub created_on_utc: NaiveDateTime,
    pub last_login_utc: Option<NaiveDateTime>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Membership runs up to, but not including, the expiry date.
    pub fn is_member_on(&self, today: NaiveDate) -> bool {
        self.membership_expiry.is_some_and(|expiry| expiry > today)
    }

    pub fn is_site_admin(&self) -> bool {
        self.is_coordinator || self.is_committee || self.is_admin
    }

    /// Site admins may act on anyone; everyone else only on themselves.
    pub fn is_authorised(&self, user_id: i64) -> bool {
        self.is_site_admin() || self.id == user_id
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("slug", &self.slug)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("membership_expiry", &self.membership_expiry)
            .finish_non_exhaustive()
    }
}

impl Record for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [Column] = &[
        Column::new("id", "INTEGER PRIMARY KEY"),
        Column::new("slug", "TEXT UNIQUE NOT NULL"),
        Column::new("email", "TEXT UNIQUE NOT NULL"),
        Column::new("password_hash", "TEXT NOT NULL"),
        Column::new("first_name", "TEXT NOT NULL"),
        Column::new("last_name", "TEXT NOT NULL"),
        Column::new("about", "TEXT"),
        Column::new("mobile", "TEXT NOT NULL"),
        Column::new("in_case_emergency", "TEXT NOT NULL"),
        Column::new("profile_picture_url", "TEXT"),
        Column::new("is_admin", "BOOLEAN NOT NULL"),
        Column::new("is_committee", "BOOLEAN NOT NULL"),
        Column::new("is_coordinator", "BOOLEAN NOT NULL"),
        Column::new("is_winter_skills", "BOOLEAN NOT NULL"),
        Column::new("discord_id", "TEXT"),
        Column::new("membership_expiry", "DATE"),
        Column::new("is_dormant", "BOOLEAN NOT NULL"),
        Column::new("committee_role", "INTEGER"),
        Column::new("committee_bio", "TEXT NOT NULL"),
        Column::new("created_on_utc", "DATETIME NOT NULL"),
        Column::new("last_login_utc", "DATETIME"),
    ];
}

impl Keyed for User {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }

    fn key_filter(key: &i64) -> Filter {
        Filter::by("id", *key)
    }
}

impl Allocated for User {}
