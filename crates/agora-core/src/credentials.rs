use std::sync::Arc;

use agora_db::Database;
use agora_db::models::UserRow;
use agora_types::models::UserId;
use tracing::{info, warn};

use crate::error::{CoreError, CoreResult};
use crate::password::{hash_password, verify_password};
use crate::validation::{
    is_blank_or_invisible, validate_email, validate_new_password, validate_username,
};

/// User records: identity, salted password hash, ban flag.
#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<Database>,
    admin_email: String,
}

impl CredentialStore {
    pub fn new(db: Arc<Database>, admin_email: impl Into<String>) -> Self {
        Self {
            db,
            admin_email: admin_email.into(),
        }
    }

    /// Insert a user whose password is already hashed.
    ///
    /// Uniqueness of the email is probed before the insert. Two signups racing
    /// with the same email can both pass the probe; the loser then hits the
    /// UNIQUE index and also gets `Conflict`.
    pub fn create_user(&self, name: &str, email: &str, password_hash: &str) -> CoreResult<UserId> {
        if self.db.email_exists(email)? {
            return Err(CoreError::Conflict(format!("email {} is already registered", email)));
        }

        match self.db.create_user(name, email, password_hash) {
            Ok(id) => Ok(id),
            Err(e) if agora_db::is_constraint_violation(&e) => {
                warn!("Concurrent signup lost the race for {}", email);
                Err(CoreError::Conflict(format!("email {} is already registered", email)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check an email/password pair. The checks run in a fixed order:
    /// unknown email (`NotFound`), banned account (`Forbidden`), wrong
    /// password (`Unauthorized`). A banned user is refused even with the
    /// right password.
    pub fn verify_credentials(&self, email: &str, password: &str) -> CoreResult<UserId> {
        let user = self
            .db
            .get_user_by_email(email)?
            .ok_or(CoreError::NotFound("user"))?;

        if user.is_banned {
            return Err(CoreError::Forbidden("account is banned"));
        }

        if !verify_password(password, &user.password)? {
            return Err(CoreError::Unauthorized);
        }

        Ok(user.id)
    }

    pub fn update_password(&self, user_id: UserId, password_hash: &str) -> CoreResult<()> {
        self.db.update_password(user_id, password_hash)?;
        Ok(())
    }

    pub fn update_name(&self, user_id: UserId, name: &str) -> CoreResult<()> {
        self.db.update_username(user_id, name)?;
        Ok(())
    }

    pub fn set_banned(&self, user_id: UserId, banned: bool) -> CoreResult<()> {
        if self.db.set_banned(user_id, banned)? == 0 {
            return Err(CoreError::NotFound("user"));
        }
        Ok(())
    }

    pub fn get_user(&self, user_id: UserId) -> CoreResult<UserRow> {
        self.db
            .get_user_by_id(user_id)?
            .ok_or(CoreError::NotFound("user"))
    }

    pub fn is_admin(&self, user: &UserRow) -> bool {
        user.email == self.admin_email
    }

    // -- Account flows --

    /// Validate a signup form, hash the password and create the user.
    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> CoreResult<UserId> {
        validate_username(username)?;
        validate_email(email)?;
        if self.db.email_exists(email)? {
            return Err(CoreError::Conflict(format!("email {} is already registered", email)));
        }
        validate_new_password(password, confirmation)?;

        let hash = hash_password(password)?;
        let id = self.create_user(username, email, &hash)?;
        info!("Registered user {}", id);
        Ok(id)
    }

    /// Replace the password after checking the current one.
    pub fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
        confirmation: &str,
    ) -> CoreResult<()> {
        let user = self.get_user(user_id)?;
        if !verify_password(current, &user.password)? {
            return Err(CoreError::Unauthorized);
        }
        validate_new_password(new, confirmation)?;

        self.update_password(user_id, &hash_password(new)?)
    }

    pub fn change_name(&self, user_id: UserId, new_name: &str) -> CoreResult<()> {
        if is_blank_or_invisible(new_name) {
            return Err(CoreError::invalid("name cannot be blank or contain invisible characters"));
        }
        self.update_name(user_id, new_name)
    }

    /// Flip the ban flag of `target`; only the admin account may do this.
    /// Read-then-write, which is fine for a single admin.
    pub fn toggle_ban(&self, actor: UserId, target: UserId) -> CoreResult<bool> {
        let admin = self.get_user(actor)?;
        if !self.is_admin(&admin) {
            return Err(CoreError::Forbidden("admin only"));
        }

        let user = self.get_user(target)?;
        let banned = !user.is_banned;
        self.set_banned(target, banned)?;

        info!("Ban status for user {} set to {}", target, banned);
        Ok(banned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ADMIN: &str = "admin@gmail.com";

    fn store() -> (TempDir, CredentialStore) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(Database::open(&dir.path().join("users.db")).unwrap());
        (dir, CredentialStore::new(db, ADMIN))
    }

    #[test]
    fn verify_checks_existence_then_ban_then_password() {
        let (_dir, store) = store();
        let id = store
            .register("alice", "alice@example.com", "password1", "password1")
            .unwrap();

        assert_eq!(store.verify_credentials("alice@example.com", "password1").unwrap(), id);
        assert!(matches!(
            store.verify_credentials("nobody@example.com", "password1"),
            Err(CoreError::NotFound("user"))
        ));
        assert!(matches!(
            store.verify_credentials("alice@example.com", "wrong-password"),
            Err(CoreError::Unauthorized)
        ));

        store.set_banned(id, true).unwrap();
        assert!(matches!(
            store.verify_credentials("alice@example.com", "password1"),
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            store.verify_credentials("alice@example.com", "wrong-password"),
            Err(CoreError::Forbidden(_))
        ));
    }

    #[test]
    fn duplicate_email_conflicts() {
        let (_dir, store) = store();
        store.create_user("a", "dup@example.com", "h").unwrap();
        assert!(matches!(
            store.create_user("b", "dup@example.com", "h"),
            Err(CoreError::Conflict(_))
        ));
        assert!(matches!(
            store.register("c", "dup@example.com", "password1", "password1"),
            Err(CoreError::Conflict(_))
        ));
    }

    #[test]
    fn display_names_need_not_be_unique() {
        let (_dir, store) = store();
        store.create_user("same", "one@example.com", "h").unwrap();
        store.create_user("same", "two@example.com", "h").unwrap();
    }

    #[test]
    fn change_password_requires_current() {
        let (_dir, store) = store();
        let id = store
            .register("bob", "bob@example.com", "password1", "password1")
            .unwrap();

        assert!(matches!(
            store.change_password(id, "nope", "password2", "password2"),
            Err(CoreError::Unauthorized)
        ));
        assert!(matches!(
            store.change_password(id, "password1", "short", "short"),
            Err(CoreError::Invalid(_))
        ));

        store
            .change_password(id, "password1", "password2", "password2")
            .unwrap();
        assert_eq!(store.verify_credentials("bob@example.com", "password2").unwrap(), id);
    }

    #[test]
    fn change_name_rejects_invisible() {
        let (_dir, store) = store();
        let id = store.create_user("carol", "carol@example.com", "h").unwrap();

        assert!(store.change_name(id, "\u{200B}").is_err());
        store.change_name(id, "Carol B").unwrap();
        assert_eq!(store.get_user(id).unwrap().username, "Carol B");
    }

    #[test]
    fn only_admin_toggles_bans() {
        let (_dir, store) = store();
        let admin = store.create_user("Admin", ADMIN, "h").unwrap();
        let user = store.create_user("dave", "dave@example.com", "h").unwrap();

        assert!(matches!(store.toggle_ban(user, admin), Err(CoreError::Forbidden(_))));
        assert!(store.toggle_ban(admin, user).unwrap());
        assert!(store.get_user(user).unwrap().is_banned);
        assert!(!store.toggle_ban(admin, user).unwrap());
        assert!(matches!(store.toggle_ban(admin, 999), Err(CoreError::NotFound(_))));
    }
}
