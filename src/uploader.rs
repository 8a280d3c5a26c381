//! アップロードシミュレータ
//!
//! 疑似的な転送を進捗タイマーで駆動し、完了時に選択バッファの内容を
//! グループとしてリポジトリへコミットする。進捗の演出は表示のための
//! ペーシングであり、データ操作の正しさはタイマーに依存しない
//! （ティック間隔を縮めれば実質同期的に完了する）。

use crate::error::{Result, UploaderError};
use crate::notify::{EventSink, UploaderEvent};
use crate::repository::{CommitReceipt, GroupRepository};
use crate::selection::SelectionBuffer;
use image_uploader_common::{codec, StoredImage};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// アップロードの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    InProgress,
    Completed,
}

/// startの結果
#[derive(Debug, Clone, Copy)]
pub enum UploadOutcome {
    /// グループとしてコミットした
    Committed(CommitReceipt),

    /// 利用者が中断した。コミット済みデータには影響しない
    Cancelled,

    /// 全ファイルのエンコードに失敗し、何もコミットしなかった
    NothingEncoded,
}

/// 1ティックあたりの進捗増分の上限（%）
const MAX_PROGRESS_STEP: f64 = 10.0;

/// 既定のティック間隔
const DEFAULT_TICK: Duration = Duration::from_millis(200);

pub struct UploadSimulator {
    repository: Arc<GroupRepository>,
    sink: Arc<dyn EventSink>,
    tick: Duration,
    state: Mutex<UploadState>,
    cancel_requested: AtomicBool,
}

impl UploadSimulator {
    pub fn new(repository: Arc<GroupRepository>, sink: Arc<dyn EventSink>) -> Self {
        Self::with_tick_interval(repository, sink, DEFAULT_TICK)
    }

    /// ティック間隔を指定して作る（テストでは短縮できる）
    pub fn with_tick_interval(
        repository: Arc<GroupRepository>,
        sink: Arc<dyn EventSink>,
        tick: Duration,
    ) -> Self {
        Self {
            repository,
            sink,
            tick,
            state: Mutex::new(UploadState::Idle),
            cancel_requested: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> UploadState {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 転送中の処理を中断する
    ///
    /// InProgress以外では何もしない。
    pub fn cancel(&self) {
        if self.state() == UploadState::InProgress {
            self.cancel_requested.store(true, Ordering::SeqCst);
        }
    }

    /// 疑似アップロードを開始し、完了まで駆動する
    ///
    /// Idleかつバッファが空でないときだけ有効。完了時はバッファの各
    /// ファイルをエンコードしてコミットし、バッファを空にする。個々の
    /// ファイルのエンコード失敗はスキップして残りを続行する。
    pub async fn start(&self, buffer: &mut SelectionBuffer) -> Result<UploadOutcome> {
        {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if *state != UploadState::Idle {
                return Err(UploaderError::InvalidState(
                    "アップロードが既に進行中です".into(),
                ));
            }
            if buffer.is_empty() {
                return Err(UploaderError::InvalidState(
                    "選択されたファイルがありません".into(),
                ));
            }
            self.cancel_requested.store(false, Ordering::SeqCst);
            *state = UploadState::InProgress;
        }

        if !self.drive_progress().await {
            self.set_state(UploadState::Idle);
            self.sink.notify(UploaderEvent::UploadCancelled);
            return Ok(UploadOutcome::Cancelled);
        }

        self.set_state(UploadState::Completed);

        let images = self.encode_buffer(buffer).await;
        if images.is_empty() {
            log::warn!("エンコードできたファイルがないため、グループを作りません");
            self.set_state(UploadState::Idle);
            return Ok(UploadOutcome::NothingEncoded);
        }

        let receipt = match self
            .repository
            .commit_group(images.clone(), chrono::Utc::now().timestamp_millis())
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                self.set_state(UploadState::Idle);
                return Err(e);
            }
        };

        self.sink.notify(UploaderEvent::UploadCompleted {
            timestamp: receipt.timestamp,
            images,
        });
        buffer.clear();
        self.set_state(UploadState::Idle);
        Ok(UploadOutcome::Committed(receipt))
    }

    /// 進捗が100%に達するかキャンセルされるまでタイマーを回す
    ///
    /// 完走したらtrue、キャンセルならfalse。
    async fn drive_progress(&self) -> bool {
        let mut interval = tokio::time::interval(self.tick);
        let mut progress = 0.0_f64;

        while progress < 100.0 {
            interval.tick().await;
            if self.cancel_requested.swap(false, Ordering::SeqCst) {
                return false;
            }

            progress += rand::rng().random_range(1.0..=MAX_PROGRESS_STEP);
            let percent = progress.min(100.0) as u8;
            self.sink
                .notify(UploaderEvent::UploadProgress { percent });
        }
        true
    }

    /// バッファ内の各ファイルを読み込んでData URLにエンコードする
    ///
    /// 読めなかったファイルはイベントで報告してスキップする。
    async fn encode_buffer(&self, buffer: &SelectionBuffer) -> Vec<StoredImage> {
        let mut images = Vec::new();
        for entry in buffer.snapshot() {
            match tokio::fs::read(&entry.path).await {
                Ok(bytes) => {
                    let data = codec::encode_data_url(&entry.mime_type, &bytes);
                    images.push(StoredImage {
                        id: entry.id.clone(),
                        name: entry.file_name.clone(),
                        mime_type: entry.mime_type.clone(),
                        data,
                        size_bytes: bytes.len() as u64,
                    });
                }
                Err(e) => {
                    log::warn!(
                        "エンコードに失敗したためスキップします ({}): {}",
                        entry.path.display(),
                        e
                    );
                    self.sink.notify(UploaderEvent::EncodingFailed {
                        file_name: entry.file_name.clone(),
                        detail: e.to_string(),
                    });
                }
            }
        }
        images
    }

    fn set_state(&self, next: UploadState) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *state = next;
    }
}
