use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    claims::TokenSubject,
    jwt::TokenCodec,
    password::{hash_password, verify_password},
};
use crate::{
    error::ApiError,
    users::{NewUser, StoreError, User, UserStore},
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn validate_new_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Checks an email/password pair against the store. Unknown email and wrong password
/// are indistinguishable to the caller.
pub async fn authenticate(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let Some(user) = store.find_by_email(email).await? else {
        warn!("login unknown email");
        return Err(invalid());
    };

    if !verify_password(password, &user.password_hash) {
        warn!(user_id = user.id, "login invalid password");
        return Err(invalid());
    }

    Ok(user)
}

pub async fn register(
    store: &dyn UserStore,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    let hash = hash_password(password)?;
    match store
        .insert(NewUser {
            name,
            email,
            password_hash: &hash,
        })
        .await
    {
        Ok(user) => {
            info!(user_id = user.id, "user registered");
            Ok(user)
        }
        Err(StoreError::Duplicate) => {
            warn!("email already registered");
            Err(ApiError::Conflict("User already exists".into()))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn issue_for(codec: &TokenCodec, user: &User) -> Result<String, ApiError> {
    Ok(codec.issue(&TokenSubject::from(user))?)
}
