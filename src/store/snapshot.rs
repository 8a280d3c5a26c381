//! スナップショット型ストア
//!
//! 全グループを名前空間ごとの1つのJSONファイルに直列化する。変更のたびに
//! 全体を書き直す。想定規模は数十グループ・数MBなので全書き直しで足りる。

use super::{GroupStore, LoadReport};
use crate::error::{Result, UploaderError};
use async_trait::async_trait;
use image_uploader_common::ImageGroup;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

pub struct SnapshotStore {
    path: PathBuf,
    quota_bytes: u64,
}

impl SnapshotStore {
    pub fn new(data_dir: &Path, namespace: &str, quota_bytes: u64) -> Self {
        Self {
            path: data_dir.join(format!("{}.json", namespace)),
            quota_bytes,
        }
    }

    /// スナップショットファイルのパス
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_snapshot(&self, full_state: &[ImageGroup]) -> Result<()> {
        // 空になったらファイルごと消す（レコード不在 = グループなし）
        if full_state.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        let blob = serde_json::to_vec(full_state)?;
        if blob.len() as u64 > self.quota_bytes {
            return Err(UploaderError::QuotaExceeded {
                needed: blob.len() as u64,
                quota: self.quota_bytes,
            });
        }

        let mut file = File::create(&self.path)?;
        file.write_all(&blob)?;
        Ok(())
    }
}

#[async_trait]
impl GroupStore for SnapshotStore {
    async fn load_all(&self) -> Result<LoadReport> {
        if !self.path.exists() {
            return Ok(LoadReport::default());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        match serde_json::from_reader::<_, Vec<ImageGroup>>(reader) {
            Ok(groups) => {
                // 空グループは不変条件違反なので読み捨てる
                let groups: Vec<ImageGroup> = groups
                    .into_iter()
                    .filter(|group| !group.images.is_empty())
                    .collect();
                Ok(LoadReport {
                    groups,
                    corruption_reset: false,
                })
            }
            Err(e) => {
                log::warn!(
                    "保存データの解析に失敗したため初期化します ({}): {}",
                    self.path.display(),
                    e
                );
                std::fs::remove_file(&self.path)?;
                Ok(LoadReport {
                    groups: Vec::new(),
                    corruption_reset: true,
                })
            }
        }
    }

    async fn save_group(&self, _group: &ImageGroup, full_state: &[ImageGroup]) -> Result<()> {
        self.write_snapshot(full_state)
    }

    async fn delete_group(&self, _timestamp: i64, full_state: &[ImageGroup]) -> Result<()> {
        self.write_snapshot(full_state)
    }

    async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
