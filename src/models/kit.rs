use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{Allocated, Column, Filter, Keyed, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum KitGroup {
    General,
    Maps,
    Books,
    Helmets,
    Climbing,
    Winter,
}

integer_code!(KitGroup {
    General = 1,
    Maps = 2,
    Books = 3,
    Helmets = 4,
    Climbing = 5,
    Winter = 6,
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KitItem {
    pub id: i64,
    pub club_id: String,
    pub description: String,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub kit_group: KitGroup,
    pub kit_type: Option<String>,
    pub purchased_on: NaiveDate,
    pub purchase_price: f64,
}

impl Record for KitItem {
    const TABLE: &'static str = "kit_item";
    const COLUMNS: &'static [Column] = &[
        Column::new("id", "INTEGER PRIMARY KEY"),
        Column::new("club_id", "TEXT NOT NULL"),
        Column::new("description", "TEXT NOT NULL"),
        Column::new("brand", "TEXT"),
        Column::new("color", "TEXT"),
        Column::new("size", "TEXT"),
        Column::new("kit_group", "INTEGER NOT NULL"),
        Column::new("kit_type", "TEXT"),
        Column::new("purchased_on", "DATE NOT NULL"),
        Column::new("purchase_price", "FLOAT NOT NULL"),
    ];
}

impl Keyed for KitItem {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }

    fn key_filter(key: &i64) -> Filter {
        Filter::by("id", *key)
    }
}

impl Allocated for KitItem {}
