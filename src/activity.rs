use crate::db::{Filter, Scope};
use crate::error::Result;
use crate::models::Activity;

/// Appends one line to the audit trail, stamped now. Pass the write scope
/// of the change being described so both land in the same transaction.
pub fn record(
    scope: &Scope,
    user_id: Option<i64>,
    event_id: Option<i64>,
    action: impl Into<String>,
) -> Result<()> {
    scope.insert(&Activity::new(user_id, event_id, action))
}

pub fn record_at(
    scope: &Scope,
    user_id: Option<i64>,
    event_id: Option<i64>,
    action: impl Into<String>,
    at: chrono::NaiveDateTime,
) -> Result<()> {
    scope.insert(&Activity {
        user_id,
        event_id,
        action: action.into(),
        dt: at,
    })
}

/// Newest first.
pub fn recent(scope: &Scope, limit: usize) -> Result<Vec<Activity>> {
    let mut entries = scope.list::<Activity>()?;
    newest_first(&mut entries);
    entries.truncate(limit);
    Ok(entries)
}

/// Entries about the given member, newest first.
pub fn mentioning(scope: &Scope, user_id: i64) -> Result<Vec<Activity>> {
    let mut entries = scope.list_where::<Activity>(&Filter::by("user_id", user_id))?;
    newest_first(&mut entries);
    Ok(entries)
}

pub fn for_event(scope: &Scope, event_id: i64) -> Result<Vec<Activity>> {
    let mut entries = scope.list_where::<Activity>(&Filter::by("event_id", event_id))?;
    newest_first(&mut entries);
    Ok(entries)
}

fn newest_first(entries: &mut [Activity]) {
    entries.sort_by(|a, b| b.dt.cmp(&a.dt));
}
