use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::db::models::User;
use crate::error::StoreResult;

/// Fixed name of the slot holding the signed-in user.
pub const SESSION_SLOT: &str = "current_user";

/// The signed-in user as mirrored into the session slot. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i64,
    pub login: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    pub created_at: NaiveDate,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            login: user.login.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            created_at: user.created_at,
        }
    }
}

/// Small persistent slot for the current session, separate from the catalog tables.
#[async_trait]
pub trait SessionSlot: Send + Sync {
    async fn load(&self) -> StoreResult<Option<SessionUser>>;

    async fn store(&self, user: &SessionUser) -> StoreResult<()>;

    async fn clear(&self) -> StoreResult<()>;
}

/// Keeps the session as `<dir>/current_user.json`.
pub struct FileSessionSlot {
    path: PathBuf,
}

impl FileSessionSlot {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{SESSION_SLOT}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionSlot for FileSessionSlot {
    async fn load(&self) -> StoreResult<Option<SessionUser>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, user: &SessionUser) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(user)?).await?;
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session slot that lives only as long as the process.
#[derive(Default)]
pub struct MemorySessionSlot {
    user: Mutex<Option<SessionUser>>,
}

impl MemorySessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: SessionUser) -> Self {
        Self {
            user: Mutex::new(Some(user)),
        }
    }
}

#[async_trait]
impl SessionSlot for MemorySessionSlot {
    async fn load(&self) -> StoreResult<Option<SessionUser>> {
        Ok(self.user.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn store(&self, user: &SessionUser) -> StoreResult<()> {
        *self.user.lock().unwrap_or_else(|e| e.into_inner()) = Some(user.clone());
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        *self.user.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
