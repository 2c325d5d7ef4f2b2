use crate::clock::now_utc;
use crate::db::Db;
use crate::error::{Error, Result};
use crate::models::User;
use crate::slug::readable_id;

/// What a new member supplies when signing up. The password must already
/// be hashed.
#[derive(Clone, Debug)]
pub struct Registration {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub about: Option<String>,
}

impl Registration {
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password_hash: password_hash.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            about: None,
        }
    }
}

/// Stores a new, non-member user. A second registration with the same
/// email fails with `Error::ConstraintViolation`.
pub fn register_user(db: &Db, registration: Registration) -> Result<User> {
    if registration.first_name.trim().is_empty() {
        return Err(Error::Validation("First name cannot be blank!".to_owned()));
    }
    if registration.last_name.trim().is_empty() {
        return Err(Error::Validation("Last name cannot be blank!".to_owned()));
    }

    let user = db.write(|tx| {
        let id = tx.next_id::<User>()?;
        let user = User {
            id,
            slug: readable_id(&[
                registration.first_name.as_str(),
                registration.last_name.as_str(),
                id.to_string().as_str(),
            ]),
            email: registration.email.to_lowercase(),
            password_hash: registration.password_hash,
            first_name: registration.first_name,
            last_name: registration.last_name,
            about: registration.about.filter(|about| !about.is_empty()),
            mobile: String::new(),
            in_case_emergency: String::new(),
            profile_picture_url: None,
            is_admin: false,
            is_committee: false,
            is_coordinator: false,
            is_winter_skills: false,
            discord_id: None,
            membership_expiry: None,
            is_dormant: false,
            committee_role: None,
            committee_bio: String::new(),
            created_on_utc: now_utc(),
            last_login_utc: None,
        };
        tx.insert(&user)?;
        Ok(user)
    })?;

    log::info!("Registered user {} ({})", user.id, user.slug);
    Ok(user)
}
