//! 通知イベント
//!
//! コアが発行するユーザー向け通知。トースト等の表示はEventSinkの実装側が
//! 担う。シンクはリポジトリやシミュレータの構築時に明示的に注入する。

use image_uploader_common::{RejectReason, StoredImage};

/// コアが発行する通知イベント
#[derive(Debug, Clone)]
pub enum UploaderEvent {
    /// ファイル検証で却下した（1ファイルごと）
    ValidationRejected {
        file_name: String,
        reason: RejectReason,
    },

    /// アップロード進捗（0〜100）
    UploadProgress { percent: u8 },

    /// アップロード完了。確定したグループの内容を運ぶので、
    /// 表示側はストアを読み直さずに描画できる
    UploadCompleted {
        timestamp: i64,
        images: Vec<StoredImage>,
    },

    /// アップロードを中断した
    UploadCancelled,

    /// 個別ファイルのエンコードに失敗した（該当ファイルはスキップ）
    EncodingFailed { file_name: String, detail: String },

    /// ストレージ容量超過。メモリ上の状態は維持される
    QuotaExceeded,

    /// 破損した保存データを破棄して初期化した
    StoreCorrupted,

    /// 永続ストレージが利用できない（メモリのみで継続）
    StoreUnavailable,

    /// 画像1枚を削除した
    ImageDeleted { timestamp: i64, image_id: String },

    /// グループを削除した
    GroupDeleted { timestamp: i64 },

    /// 全グループを削除した
    AllDeleted,
}

/// 通知の受け口
pub trait EventSink: Send + Sync {
    fn notify(&self, event: UploaderEvent);
}

/// 何もしないシンク
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&self, _event: UploaderEvent) {}
}

/// イベントを蓄積するシンク（テスト・組み込み用）
#[derive(Debug, Default)]
pub struct MemorySink {
    events: std::sync::Mutex<Vec<UploaderEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// これまでに受け取ったイベントの複製を返す
    pub fn events(&self) -> Vec<UploaderEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl EventSink for MemorySink {
    fn notify(&self, event: UploaderEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
