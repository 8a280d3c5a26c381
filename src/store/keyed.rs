//! キー付きレコード型ストア
//!
//! グループごとに1つのJSONレコードを名前空間ディレクトリに保存する。
//! キーはグループのtimestamp。レコード用ディレクトリは初回利用時に作成し、
//! I/Oはすべて非同期。読み書きはレコード単位に失敗しうるので、破損も
//! レコード単位で回復する。

use super::{GroupStore, LoadReport};
use crate::error::{Result, UploaderError};
use async_trait::async_trait;
use image_uploader_common::ImageGroup;
use std::path::{Path, PathBuf};

pub struct KeyedStore {
    dir: PathBuf,
    quota_bytes: u64,
}

impl KeyedStore {
    pub fn new(data_dir: &Path, namespace: &str, quota_bytes: u64) -> Self {
        Self {
            dir: data_dir.join(namespace),
            quota_bytes,
        }
    }

    /// レコード用ディレクトリのパス
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, timestamp: i64) -> PathBuf {
        self.dir.join(format!("{}.json", timestamp))
    }

    /// 対象レコードを除いた現在の総保存量
    async fn stored_bytes_except(&self, timestamp: i64) -> Result<u64> {
        let skip = self.record_path(timestamp);
        let mut total = 0u64;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path == skip || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            total += entry.metadata().await?.len();
        }
        Ok(total)
    }
}

#[async_trait]
impl GroupStore for KeyedStore {
    async fn load_all(&self) -> Result<LoadReport> {
        if !self.dir.exists() {
            return Ok(LoadReport::default());
        }

        let mut report = LoadReport::default();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<ImageGroup>(&bytes) {
                Ok(group) if !group.images.is_empty() => report.groups.push(group),
                Ok(_) => {
                    // 空グループのレコードは不変条件違反
                    log::warn!("空グループのレコードを破棄します: {}", path.display());
                    tokio::fs::remove_file(&path).await?;
                    report.corruption_reset = true;
                }
                Err(e) => {
                    log::warn!("破損レコードを破棄します ({}): {}", path.display(), e);
                    tokio::fs::remove_file(&path).await?;
                    report.corruption_reset = true;
                }
            }
        }

        report.groups.sort_by_key(|group| group.timestamp);
        Ok(report)
    }

    async fn save_group(&self, group: &ImageGroup, _full_state: &[ImageGroup]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let record = serde_json::to_vec(group)?;
        let used = self.stored_bytes_except(group.timestamp).await?;
        let needed = used + record.len() as u64;
        if needed > self.quota_bytes {
            return Err(UploaderError::QuotaExceeded {
                needed,
                quota: self.quota_bytes,
            });
        }

        tokio::fs::write(self.record_path(group.timestamp), record).await?;
        Ok(())
    }

    async fn delete_group(&self, timestamp: i64, _full_state: &[ImageGroup]) -> Result<()> {
        match tokio::fs::remove_file(self.record_path(timestamp)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}
