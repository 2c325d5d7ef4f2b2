use rusqlite_migration::{Migrations, M};

/// Steps applied after `Db::create_tables`, tracked in `user_version`.
/// Append new steps; never edit one that has shipped.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up("CREATE INDEX IF NOT EXISTS attendees_event_id ON attendees(event_id);"),
        M::up(
            "CREATE INDEX IF NOT EXISTS activity_event_id ON activity(event_id);
             CREATE INDEX IF NOT EXISTS activity_user_id ON activity(user_id);",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use crate::db::Db;

    #[test]
    fn setup_creates_indexes_once() {
        let db = Db::open_memory().unwrap();
        db.setup().unwrap();
        db.setup().unwrap();

        let mut names = db
            .read(|s| {
                let mut stmt = s
                    .connection()
                    .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND sql IS NOT NULL")
                    .unwrap();
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))
                    .unwrap()
                    .collect::<Result<Vec<_>, _>>()
                    .unwrap();
                Ok(names)
            })
            .unwrap();
        names.sort();
        assert_eq!(
            names,
            vec!["activity_event_id", "activity_user_id", "attendees_event_id"]
        );
    }
}
