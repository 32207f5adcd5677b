use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        password::{hash_password_blocking, verify_against_dummy, verify_password_blocking},
        repo::{CreateUserError, UserRepository},
        repo_types::{NewUser, Role, User},
    },
    error::{AppError, AppResult, FieldErrors, EMAIL_EXISTS},
    state::AppState,
    validation::{check_email, check_name, check_password},
};

/// Registration, authentication and lookup of users.
#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<dyn UserRepository>,
}

impl FromRef<AppState> for UserDirectory {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone())
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserDirectory {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> AppResult<User> {
        self.register_with_role(name, email, password, Role::User)
            .await
    }

    pub(crate) async fn register_with_role(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> AppResult<User> {
        let mut errors = FieldErrors::new();
        if let Some(msg) = check_name(name) {
            errors.insert("name".into(), msg.into());
        }
        if let Some(msg) = check_email(email) {
            errors.insert("email".into(), msg.into());
        }
        if let Some(msg) = check_password(password) {
            errors.insert("password".into(), msg.into());
        }
        if let Some(err) = AppError::from_fields(errors) {
            return Err(err);
        }

        let email = normalize_email(email);
        if self.users.find_by_email(&email).await?.is_some() {
            warn!(%email, "email already registered");
            return Err(AppError::Duplicate(EMAIL_EXISTS));
        }

        let password_hash = hash_password_blocking(password.to_owned()).await?;
        let user = self
            .users
            .create(NewUser {
                name: name.trim().to_owned(),
                email,
                password_hash,
                role,
            })
            .await
            .map_err(|e| match e {
                CreateUserError::EmailTaken => AppError::Duplicate(EMAIL_EXISTS),
                CreateUserError::Other(e) => AppError::Internal(e),
            })?;

        info!(user_id = %user.id, email = %user.email, role = %user.role, "user registered");
        Ok(user)
    }

    /// Unknown email and wrong password are reported identically.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<User> {
        let mut errors = FieldErrors::new();
        if let Some(msg) = check_email(email) {
            errors.insert("email".into(), msg.into());
        }
        if password.is_empty() {
            errors.insert("password".into(), "Password is required".into());
        }
        if let Some(err) = AppError::from_fields(errors) {
            return Err(err);
        }

        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            verify_against_dummy(password.to_owned()).await;
            warn!(%email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        };

        let ok = verify_password_blocking(password.to_owned(), user.password_hash.clone()).await?;
        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        self.users.find_by_id(id).await
    }

    pub async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        self.users.find_many(ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn directory() -> (UserDirectory, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (UserDirectory::new(store.clone()), store)
    }

    #[tokio::test]
    async fn register_stores_a_hash_not_the_password() {
        let (dir, _) = directory();
        let user = dir
            .register("Jane", "  Jane@Example.com ", "testpass")
            .await
            .unwrap();
        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.role, Role::User);
        assert_ne!(user.password_hash, "testpass");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn duplicate_email_is_case_insensitive() {
        let (dir, store) = directory();
        dir.register("Jane", "jane@example.com", "testpass")
            .await
            .unwrap();
        let err = dir
            .register("Other Jane", "JANE@example.COM", "otherpass")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate(EMAIL_EXISTS)));
        let kept = store.find_by_email("jane@example.com").await.unwrap().unwrap();
        assert_eq!(kept.name, "Jane");
    }

    #[tokio::test]
    async fn register_reports_every_invalid_field() {
        let (dir, _) = directory();
        let err = dir.register("J", "not-an-email", "123").await.unwrap_err();
        let AppError::Validation { errors, .. } = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(
            errors.keys().map(String::as_str).collect::<Vec<_>>(),
            ["email", "name", "password"]
        );
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_indistinguishable() {
        let (dir, _) = directory();
        dir.register("Jane", "jane@example.com", "testpass")
            .await
            .unwrap();

        let wrong_password = dir
            .authenticate("jane@example.com", "badpass")
            .await
            .unwrap_err();
        let unknown_email = dir
            .authenticate("ghost@example.com", "testpass")
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_email, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(wrong_password.status(), unknown_email.status());
    }

    #[tokio::test]
    async fn authenticate_accepts_any_email_case() {
        let (dir, _) = directory();
        let registered = dir
            .register("Jane", "jane@example.com", "testpass")
            .await
            .unwrap();
        let user = dir
            .authenticate("JANE@example.com", "testpass")
            .await
            .unwrap();
        assert_eq!(user.id, registered.id);
        assert_eq!(
            dir.find_by_id(user.id).await.unwrap().map(|u| u.name),
            Some("Jane".to_string())
        );
    }
}
