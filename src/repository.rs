//! グループリポジトリ
//!
//! 全画像グループのメモリ上の正本。ストアへの読み書きをすべて仲介し、
//! メモリとストアが乖離しないようにする。変更操作は「メモリへ確定 →
//! 永続化を試行」の順で行い、永続化の失敗はイベントで通知するがメモリ
//! 状態は巻き戻さない。セッション内はメモリが正で、耐久性はベスト
//! エフォート。
//!
//! 状態は1つのtokio Mutexの下にあり、ロックは永続化のawaitをまたいで
//! 保持する。変更操作は常に最大1件しか進行しない。

use crate::error::{Result, UploaderError};
use crate::notify::{EventSink, UploaderEvent};
use crate::store::GroupStore;
use image_uploader_common::{ImageGroup, StoredImage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// commit_groupの結果
#[derive(Debug, Clone, Copy)]
pub struct CommitReceipt {
    /// 確定したグループのキー
    pub timestamp: i64,

    /// ストアへの書き込みまで成功したか。falseならこのセッション限りで、
    /// 再起動後には残らない可能性がある
    pub durable: bool,
}

#[derive(Default)]
struct RepoState {
    groups: HashMap<i64, ImageGroup>,
    initialized: bool,
}

pub struct GroupRepository {
    store: Arc<dyn GroupStore>,
    sink: Arc<dyn EventSink>,
    state: Mutex<RepoState>,
}

impl GroupRepository {
    pub fn new(store: Arc<dyn GroupStore>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            sink,
            state: Mutex::new(RepoState::default()),
        }
    }

    /// 保存済みグループをメモリへ読み込む
    ///
    /// 他の操作より先に完了していること。読み込みに失敗した場合は空の
    /// 状態で開始し、警告イベントを発行する。ブロックし続けることはない。
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        match self.store.load_all().await {
            Ok(report) => {
                if report.corruption_reset {
                    self.sink.notify(UploaderEvent::StoreCorrupted);
                }
                state.groups = report
                    .groups
                    .into_iter()
                    .map(|group| (group.timestamp, group))
                    .collect();
            }
            Err(e) => {
                log::warn!("ストアの読み込みに失敗。空の状態で開始します: {}", e);
                self.sink.notify(UploaderEvent::StoreUnavailable);
                state.groups.clear();
            }
        }

        state.initialized = true;
        Ok(())
    }

    /// 画像のまとまりを新しいグループとして確定する
    pub async fn commit_group(
        &self,
        images: Vec<StoredImage>,
        timestamp: i64,
    ) -> Result<CommitReceipt> {
        if images.is_empty() {
            return Err(UploaderError::EmptyGroup);
        }

        let mut state = self.state.lock().await;
        ensure_initialized(&state)?;

        // 同一ミリ秒での衝突はキーをずらして回避
        let mut key = timestamp;
        while state.groups.contains_key(&key) {
            key += 1;
        }

        let group = ImageGroup {
            timestamp: key,
            images,
        };
        state.groups.insert(key, group.clone());

        let durable = self.persist_group(&state, &group).await;
        Ok(CommitReceipt {
            timestamp: key,
            durable,
        })
    }

    /// 画像1枚を削除する。グループが空になったらグループごと削除する
    pub async fn delete_image(&self, timestamp: i64, image_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        ensure_initialized(&state)?;

        let updated = {
            let group = state
                .groups
                .get_mut(&timestamp)
                .ok_or(UploaderError::GroupNotFound(timestamp))?;
            let before = group.images.len();
            group.images.retain(|image| image.id != image_id);
            if group.images.len() == before {
                return Err(UploaderError::ImageNotFound(image_id.to_string()));
            }
            group.clone()
        };

        self.sink.notify(UploaderEvent::ImageDeleted {
            timestamp,
            image_id: image_id.to_string(),
        });

        if updated.images.is_empty() {
            state.groups.remove(&timestamp);
            self.sink.notify(UploaderEvent::GroupDeleted { timestamp });
            self.persist_delete(&state, timestamp).await;
        } else {
            self.persist_group(&state, &updated).await;
        }

        Ok(())
    }

    /// グループを丸ごと削除する
    pub async fn delete_group(&self, timestamp: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        ensure_initialized(&state)?;

        if state.groups.remove(&timestamp).is_none() {
            return Err(UploaderError::GroupNotFound(timestamp));
        }

        self.sink.notify(UploaderEvent::GroupDeleted { timestamp });
        self.persist_delete(&state, timestamp).await;
        Ok(())
    }

    /// 全グループを削除する
    ///
    /// ストア側はグループ単位の削除ではなくclearを使い、一部だけ消えた
    /// 中途半端な状態を作らない。
    pub async fn delete_all(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        ensure_initialized(&state)?;

        state.groups.clear();
        self.sink.notify(UploaderEvent::AllDeleted);

        if let Err(e) = self.store.clear().await {
            self.report_persist_failure(e);
        }
        Ok(())
    }

    /// 全グループを新しい順で返す
    pub async fn list(&self) -> Result<Vec<ImageGroup>> {
        let state = self.state.lock().await;
        ensure_initialized(&state)?;

        let mut groups = ordered(&state);
        groups.reverse();
        Ok(groups)
    }

    /// グループ1件を取得する
    pub async fn get(&self, timestamp: i64) -> Result<Option<ImageGroup>> {
        let state = self.state.lock().await;
        ensure_initialized(&state)?;
        Ok(state.groups.get(&timestamp).cloned())
    }

    /// 永続化を試行し、成功したかを返す。失敗は通知のみで巻き戻さない
    async fn persist_group(&self, state: &RepoState, group: &ImageGroup) -> bool {
        let full_state = ordered(state);
        match self.store.save_group(group, &full_state).await {
            Ok(()) => true,
            Err(e) => {
                self.report_persist_failure(e);
                false
            }
        }
    }

    async fn persist_delete(&self, state: &RepoState, timestamp: i64) -> bool {
        let full_state = ordered(state);
        match self.store.delete_group(timestamp, &full_state).await {
            Ok(()) => true,
            Err(e) => {
                self.report_persist_failure(e);
                false
            }
        }
    }

    fn report_persist_failure(&self, e: UploaderError) {
        log::warn!("永続化に失敗しました（メモリ上の状態は維持）: {}", e);
        match e {
            UploaderError::QuotaExceeded { .. } => {
                self.sink.notify(UploaderEvent::QuotaExceeded);
            }
            _ => {
                self.sink.notify(UploaderEvent::StoreUnavailable);
            }
        }
    }
}

/// timestamp昇順の全グループ（ストアへ渡す形）
fn ordered(state: &RepoState) -> Vec<ImageGroup> {
    let mut groups: Vec<ImageGroup> = state.groups.values().cloned().collect();
    groups.sort_by_key(|group| group.timestamp);
    groups
}

fn ensure_initialized(state: &RepoState) -> Result<()> {
    if state.initialized {
        Ok(())
    } else {
        Err(UploaderError::NotInitialized)
    }
}
