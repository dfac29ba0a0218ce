use anyhow::Context;
use tracing::{debug, info, warn};

use super::{
    repo::{StoreError, UserStore},
    repo_types::{NewUser, User},
};
use crate::auth::password::unusable_password_hash;

/// Maps a verified external email onto an internal user, creating the user on first sight.
pub struct IdentityResolver<'a> {
    store: &'a dyn UserStore,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(store: &'a dyn UserStore) -> Self {
        Self { store }
    }

    /// Existing users are returned untouched: name and picture are never refreshed
    /// from the provider profile.
    pub async fn resolve(&self, email: &str, display_name: &str) -> anyhow::Result<User> {
        if let Some(user) = self
            .store
            .find_by_email(email)
            .await
            .context("look up user by email")?
        {
            debug!(user_id = user.id, "external identity matched existing user");
            return Ok(user);
        }

        let password_hash = unusable_password_hash()?;
        let created = self
            .store
            .insert(NewUser {
                name: display_name,
                email,
                password_hash: &password_hash,
            })
            .await;

        match created {
            Ok(user) => {
                info!(user_id = user.id, "created user from external identity");
                Ok(user)
            }
            // A concurrent first login inserted the same email between our lookup and insert.
            Err(StoreError::Duplicate) => {
                warn!("duplicate email on insert, re-reading the winning row");
                self.store
                    .find_by_email(email)
                    .await
                    .context("re-read user after duplicate insert")?
                    .context("user vanished after duplicate-key insert")
            }
            Err(e) => Err(e).context("insert user for external identity"),
        }
    }
}
