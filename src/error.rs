use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploaderError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("ストレージ容量の上限に達しました（必要: {needed}バイト / 上限: {quota}バイト）")]
    QuotaExceeded { needed: u64, quota: u64 },

    #[error("永続ストレージが利用できません: {0}")]
    StoreUnavailable(String),

    #[error("リポジトリが初期化されていません。先にinitialize()を呼んでください")]
    NotInitialized,

    #[error("グループが見つかりません: {0}")]
    GroupNotFound(i64),

    #[error("画像が見つかりません: {0}")]
    ImageNotFound(String),

    #[error("空のグループはコミットできません")]
    EmptyGroup,

    #[error("不正な操作: {0}")]
    InvalidState(String),

    #[error("入力エラー: {0}")]
    Prompt(String),

    #[error("エンコードエラー: {0}")]
    Codec(#[from] image_uploader_common::CodecError),

    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, UploaderError>;
