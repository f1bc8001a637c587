use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;

use crate::{
    error::AppError,
    models::sync::{OfflineData, SyncQueueItem},
};

const OFFLINE_DATA_FILE: &str = "offline_data.json";
const SYNC_QUEUE_FILE: &str = "sync_queue.json";

/// Local persistent key-value storage, one directory per user.
#[derive(Clone)]
pub struct StorageService {
    root: Arc<PathBuf>,
}

impl StorageService {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_structure(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root().join("users")).await?;
        Ok(())
    }

    pub fn user_dir(&self, user_uuid: &str) -> PathBuf {
        self.root().join("users").join(user_uuid)
    }

    pub async fn ensure_user_dir(&self, user_uuid: &str) -> Result<PathBuf, AppError> {
        let dir = self.user_dir(user_uuid);
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    async fn read_user_json<T: DeserializeOwned>(
        &self,
        user_uuid: &str,
        filename: &str,
    ) -> Result<Option<T>, AppError> {
        let path = self.user_dir(user_uuid).join(filename);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let raw = fs::read(&path).await?;
        if raw.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    async fn write_user_json<T: Serialize + ?Sized>(
        &self,
        user_uuid: &str,
        filename: &str,
        value: &T,
    ) -> Result<(), AppError> {
        let dir = self.ensure_user_dir(user_uuid).await?;
        let data = serde_json::to_vec_pretty(value)?;
        fs::write(dir.join(filename), data).await?;
        Ok(())
    }

    pub async fn load_offline_data(
        &self,
        user_uuid: &str,
    ) -> Result<Option<OfflineData>, AppError> {
        self.read_user_json(user_uuid, OFFLINE_DATA_FILE).await
    }

    pub async fn save_offline_data(
        &self,
        user_uuid: &str,
        data: &OfflineData,
    ) -> Result<(), AppError> {
        self.write_user_json(user_uuid, OFFLINE_DATA_FILE, data).await
    }

    pub async fn load_sync_queue(&self, user_uuid: &str) -> Result<Vec<SyncQueueItem>, AppError> {
        Ok(self
            .read_user_json(user_uuid, SYNC_QUEUE_FILE)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_sync_queue(
        &self,
        user_uuid: &str,
        queue: &[SyncQueueItem],
    ) -> Result<(), AppError> {
        self.write_user_json(user_uuid, SYNC_QUEUE_FILE, queue).await
    }
}
