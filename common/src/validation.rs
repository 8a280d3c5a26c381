//! ファイル検証
//!
//! アップロード候補ファイルをMIMEタイプ → サイズ上限 → 空ファイルの順で
//! 検査する。最初に失敗した規則が勝つ。副作用はなく、設定は呼び出し側が
//! 渡す。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// デフォルトの最大ファイルサイズ（5MB）
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// デフォルトの許可MIMEタイプ
pub const DEFAULT_ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

/// 検証対象ファイルのメタデータ
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// 検証設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadLimits {
    /// 1ファイルあたりの最大バイト数
    pub max_file_size: u64,

    /// 受け付けるMIMEタイプ
    pub allowed_types: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_types: DEFAULT_ALLOWED_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

/// 却下理由
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("対応していないファイル形式です: {mime_type}")]
    InvalidType { mime_type: String },

    #[error("ファイルサイズが上限{max_file_size}バイトを超えています: {size_bytes}バイト")]
    TooLarge { size_bytes: u64, max_file_size: u64 },

    #[error("空のファイルです")]
    EmptyFile,
}

impl RejectReason {
    /// 機械判別用の安定コード
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::InvalidType { .. } => "invalid-type",
            RejectReason::TooLarge { .. } => "too-large",
            RejectReason::EmptyFile => "empty-file",
        }
    }
}

/// 候補ファイルを検証する
pub fn validate(meta: &FileMeta, limits: &UploadLimits) -> Result<(), RejectReason> {
    if !limits.allowed_types.iter().any(|t| t == &meta.mime_type) {
        return Err(RejectReason::InvalidType {
            mime_type: meta.mime_type.clone(),
        });
    }

    if meta.size_bytes > limits.max_file_size {
        return Err(RejectReason::TooLarge {
            size_bytes: meta.size_bytes,
            max_file_size: limits.max_file_size,
        });
    }

    if meta.size_bytes == 0 {
        return Err(RejectReason::EmptyFile);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(mime_type: &str, size_bytes: u64) -> FileMeta {
        FileMeta {
            name: "test.jpg".to_string(),
            mime_type: mime_type.to_string(),
            size_bytes,
        }
    }

    #[test]
    fn test_accepts_valid_file() {
        let limits = UploadLimits::default();
        assert!(validate(&meta("image/jpeg", 1024), &limits).is_ok());
        assert!(validate(&meta("image/png", DEFAULT_MAX_FILE_SIZE), &limits).is_ok());
        assert!(validate(&meta("image/gif", 1), &limits).is_ok());
    }

    #[test]
    fn test_rejects_invalid_type() {
        let limits = UploadLimits::default();
        let reason = validate(&meta("text/plain", 1024), &limits).unwrap_err();
        assert_eq!(reason.code(), "invalid-type");
    }

    #[test]
    fn test_rejects_too_large() {
        let limits = UploadLimits::default();
        let reason = validate(&meta("image/jpeg", DEFAULT_MAX_FILE_SIZE + 1), &limits).unwrap_err();
        assert_eq!(reason.code(), "too-large");
    }

    #[test]
    fn test_rejects_empty_file() {
        let limits = UploadLimits::default();
        let reason = validate(&meta("image/png", 0), &limits).unwrap_err();
        assert_eq!(reason.code(), "empty-file");
    }

    #[test]
    fn test_first_failure_wins() {
        // 形式もサイズも不正なら、先に評価される形式の却下が勝つ
        let limits = UploadLimits::default();
        let reason = validate(&meta("text/plain", DEFAULT_MAX_FILE_SIZE + 1), &limits).unwrap_err();
        assert_eq!(reason.code(), "invalid-type");

        // 空の不正形式ファイルも同様
        let reason = validate(&meta("application/octet-stream", 0), &limits).unwrap_err();
        assert_eq!(reason.code(), "invalid-type");
    }

    #[test]
    fn test_custom_limits() {
        let limits = UploadLimits {
            max_file_size: 100,
            allowed_types: vec!["image/webp".to_string()],
        };
        assert!(validate(&meta("image/webp", 100), &limits).is_ok());
        assert_eq!(
            validate(&meta("image/jpeg", 50), &limits).unwrap_err().code(),
            "invalid-type"
        );
        assert_eq!(
            validate(&meta("image/webp", 101), &limits).unwrap_err().code(),
            "too-large"
        );
    }
}
