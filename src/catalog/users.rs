use chrono::Utc;

use super::Catalog;
use crate::auth::{password, SessionUser};
use crate::db::collection::Collection;
use crate::db::models::{NewUser, User};
use crate::error::{StoreError, StoreResult};

impl Catalog {
    pub async fn user(&self, id: i64) -> StoreResult<Option<User>> {
        self.get(id).await
    }

    /// Sign in by email or login. A wrong identifier or password is `None`, not an error.
    pub async fn login(&self, identifier: &str, password: &str) -> StoreResult<Option<User>> {
        let users: Vec<User> = self.list(None).await?;
        let user = users.into_iter().find(|u| {
            (u.email == identifier || u.login == identifier)
                && password::verify(password, &u.password_hash)
        });

        match user {
            Some(user) => {
                self.set_current_user(Some(&user)).await?;
                tracing::info!("User {} signed in", user.login);
                Ok(Some(user))
            }
            None => {
                tracing::debug!("No user matched sign-in for {}", identifier);
                Ok(None)
            }
        }
    }

    pub async fn logout(&self) -> StoreResult<()> {
        self.set_current_user(None).await
    }

    pub async fn current_user(&self) -> StoreResult<Option<SessionUser>> {
        // The slot is restored during initialization.
        self.pool().await?;
        Ok(self.current.read().await.clone())
    }

    /// Create an account and sign it in. Taken logins or emails leave the store untouched.
    pub async fn register(&self, new_user: NewUser) -> StoreResult<User> {
        for (field, value) in [
            ("login", &new_user.login),
            ("email", &new_user.email),
            ("password", &new_user.password),
        ] {
            if value.trim().is_empty() {
                return Err(StoreError::Validation(format!("{field} is required")));
            }
        }

        let users: Vec<User> = self.list(None).await?;
        if let Some(existing) = users
            .iter()
            .find(|u| u.email == new_user.email || u.login == new_user.login)
        {
            let field = if existing.login == new_user.login {
                "login"
            } else {
                "email"
            };
            return Err(StoreError::UniquenessViolation {
                collection: Collection::Users,
                detail: format!("{field} is already registered"),
            });
        }

        let next_id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let mut user = User {
            id: next_id,
            login: new_user.login,
            email: new_user.email,
            password_hash: password::hash(&new_user.password, self.password_cost())?,
            avatar: new_user.avatar.unwrap_or_default(),
            created_at: Utc::now().date_naive(),
        };
        user.id = self.add(user.clone()).await?;

        self.set_current_user(Some(&user)).await?;
        tracing::info!("Registered user {} ({})", user.login, user.id);
        Ok(user)
    }

    async fn set_current_user(&self, user: Option<&User>) -> StoreResult<()> {
        let session = user.map(SessionUser::from);
        match &session {
            Some(session) => self.session.store(session).await?,
            None => self.session.clear().await?,
        }
        *self.current.write().await = session;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemorySessionSlot, SessionSlot};
    use crate::catalog::tests::test_catalog;
    use crate::catalog::CatalogOptions;
    use std::sync::Arc;

    fn new_user(login: &str, email: &str) -> NewUser {
        NewUser {
            login: login.into(),
            email: email.into(),
            password: "secret".into(),
            avatar: None,
        }
    }

    #[tokio::test]
    async fn login_accepts_email_or_login() {
        let catalog = test_catalog();
        let by_email = catalog.login("armen@mail.ru", "123").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(2));

        let by_login = catalog.login("гаяне", "123").await.unwrap();
        assert_eq!(by_login.map(|u| u.id), Some(3));
        assert_eq!(catalog.current_user().await.unwrap().map(|u| u.id), Some(3));
    }

    #[tokio::test]
    async fn wrong_password_is_no_match() {
        let catalog = test_catalog();
        assert!(catalog.login("admin", "wrong").await.unwrap().is_none());
        assert!(catalog.login("nobody", "123").await.unwrap().is_none());
        assert!(catalog.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn register_assigns_next_id_and_signs_in() {
        let catalog = test_catalog();
        let user = catalog
            .register(new_user("ани", "ani@mail.ru"))
            .await
            .unwrap();
        assert_eq!(user.id, 4);
        assert_eq!(user.avatar, "");
        assert_ne!(user.password_hash, "secret");
        assert_eq!(catalog.current_user().await.unwrap().map(|u| u.id), Some(4));

        let again = catalog.login("ani@mail.ru", "secret").await.unwrap();
        assert_eq!(again.map(|u| u.login), Some("ани".to_string()));
    }

    #[tokio::test]
    async fn register_rejects_taken_login_or_email() {
        let catalog = test_catalog();
        for candidate in [
            new_user("admin", "fresh@mail.ru"),
            new_user("fresh", "admin@test.ru"),
        ] {
            let err = catalog.register(candidate).await.unwrap_err();
            assert!(matches!(err, StoreError::UniquenessViolation { .. }));
        }
        let users: Vec<User> = catalog.list(None).await.unwrap();
        assert_eq!(users.len(), 3);
        assert!(catalog.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn register_requires_fields() {
        let catalog = test_catalog();
        let err = catalog.register(new_user("  ", "a@b.c")).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn logout_clears_the_slot() {
        let slot = Arc::new(MemorySessionSlot::new());
        let catalog = Catalog::new(
            CatalogOptions::memory().with_password_cost(password::MIN_COST),
            slot.clone(),
        );
        catalog.login("admin", "123").await.unwrap();
        assert_eq!(slot.load().await.unwrap().map(|u| u.id), Some(1));

        catalog.logout().await.unwrap();
        assert!(slot.load().await.unwrap().is_none());
        assert!(catalog.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_is_restored_on_init() {
        let slot = Arc::new(MemorySessionSlot::new());
        let first = Catalog::new(
            CatalogOptions::memory().with_password_cost(password::MIN_COST),
            slot.clone(),
        );
        first.login("admin", "123").await.unwrap();

        let second = Catalog::new(
            CatalogOptions::memory().with_password_cost(password::MIN_COST),
            slot,
        );
        let restored = second.current_user().await.unwrap();
        assert_eq!(restored.map(|u| u.login), Some("admin".to_string()));
    }

    #[tokio::test]
    async fn prefilled_slot_becomes_the_current_user() {
        let admin = test_catalog().user(1).await.unwrap().unwrap();
        let catalog = Catalog::new(
            CatalogOptions::memory().with_password_cost(password::MIN_COST),
            Arc::new(MemorySessionSlot::with_user(SessionUser::from(&admin))),
        );
        assert!(!catalog.is_ready().await);

        let current = catalog.current_user().await.unwrap().unwrap();
        assert_eq!(current.id, 1);
        assert_eq!(current.email, "admin@test.ru");
    }
}
