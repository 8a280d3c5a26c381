//! エラー型定義

use thiserror::Error;

/// コーデック層のエラー型
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("不正なData URL形式: {0}")]
    MalformedDataUrl(String),

    #[error("Base64デコードエラー: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_malformed() {
        let error = CodecError::MalformedDataUrl("区切りがありません".to_string());
        let display = format!("{}", error);
        assert_eq!(display, "不正なData URL形式: 区切りがありません");
    }

    #[test]
    fn test_error_from_base64() {
        use base64::Engine as _;
        let decode_error = base64::engine::general_purpose::STANDARD
            .decode("not-base64!!")
            .unwrap_err();
        let error: CodecError = decode_error.into();
        assert!(matches!(error, CodecError::Base64(_)));
        assert!(format!("{}", error).contains("Base64デコードエラー"));
    }
}
