/// Gives a fieldless enum a stable INTEGER encoding: serde goes through
/// `i64`, and the enum binds directly as a query parameter.
macro_rules! integer_code {
    ($name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        impl From<$name> for i64 {
            fn from(value: $name) -> i64 {
                match value {
                    $($name::$variant => $code,)+
                }
            }
        }

        impl TryFrom<i64> for $name {
            type Error = String;

            fn try_from(code: i64) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    other => Err(format!("{} is not a valid {}", other, stringify!($name))),
                }
            }
        }

        impl rusqlite::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(i64::from(*self)))
            }
        }
    };
}

pub mod activity;
pub mod event;
pub mod kit;
pub mod user;

pub use activity::Activity;
pub use event::{Attendee, AttendeeKey, Event, EventType};
pub use kit::{KitGroup, KitItem};
pub use user::{CommitteeRole, User};
