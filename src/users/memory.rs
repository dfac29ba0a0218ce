use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    repo::{StoreError, UserStore},
    repo_types::{NewUser, User},
};

/// In-process user store with the same uniqueness rules as the `users` table.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn len(&self) -> usize {
        self.rows.lock().expect("user store lock").len()
    }

    fn update<F>(&self, id: i64, apply: F) -> Result<User, StoreError>
    where
        F: FnOnce(&mut User),
    {
        let mut rows = self.rows.lock().expect("user store lock");
        let row = rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;
        apply(row);
        Ok(row.clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let rows = self.rows.lock().expect("user store lock");
        Ok(rows.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let rows = self.rows.lock().expect("user store lock");
        Ok(rows.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, new: NewUser<'_>) -> Result<User, StoreError> {
        let mut rows = self.rows.lock().expect("user store lock");
        if rows.iter().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate);
        }
        let user = User {
            id: rows.iter().map(|u| u.id).max().unwrap_or(0) + 1,
            name: new.name.to_string(),
            email: new.email.to_string(),
            password_hash: new.password_hash.to_string(),
            profile_picture: None,
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        self.update(id, |u| u.password_hash = password_hash.to_string())
            .map(|_| ())
    }

    async fn update_profile(&self, id: i64, name: &str, email: &str) -> Result<User, StoreError> {
        {
            let rows = self.rows.lock().expect("user store lock");
            if rows.iter().any(|u| u.email == email && u.id != id) {
                return Err(StoreError::Duplicate);
            }
        }
        self.update(id, |u| {
            u.name = name.to_string();
            u.email = email.to_string();
        })
    }

    async fn set_profile_picture(&self, id: i64, path: Option<&str>) -> Result<User, StoreError> {
        self.update(id, |u| u.profile_picture = path.map(str::to_string))
    }
}
