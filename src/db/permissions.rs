use std::io;

use crate::{data::UserID, db::Permission};

use super::DB;

impl DB {
    pub fn is_superuser(&self, user: &UserID) -> bool {
        let Some(permissions) = self.permissions.get(user) else {
            return false
        };
        permissions.iter().any(|x| matches!(x, Permission::Superuser))
    }

    pub fn grant_permission(&mut self, user: &UserID, permission: Permission) -> io::Result<()> {
        let permissions = self.permissions.entry(user.clone()).or_default();
        if permissions.contains(&permission) {
            return Ok(());
        }
        permissions.push(permission);
        self.store.store_permissions(&self.permissions)
    }

    /// Grants superuser rights to each listed username that exists.
    pub fn grant_superusers(&mut self, usernames: &[String]) -> io::Result<()> {
        for username in usernames {
            let Some(id) = self.find_user_by_username(username).map(|(id, _)| id.clone()) else {
                tracing::warn!(username = %username, "configured superuser does not exist");
                continue;
            };
            self.grant_permission(&id, Permission::Superuser)?;
            tracing::info!(username = %username, user = %id.0, "superuser granted");
        }
        Ok(())
    }
}
