//! Data URLコーデック
//!
//! ファイルのバイト列と保存用テキスト表現（Base64 Data URL）の相互変換。
//! エンコード結果はMIMEタイプを自己記述するので、復元に外部メタデータは
//! 要らない。

use crate::error::{CodecError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// デコード結果
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// バイト列をData URLにエンコードする
///
/// 形式: `data:<mime>;base64,<payload>`
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Data URLからMIMEタイプ部分を抽出する
pub fn mime_type_of(data_url: &str) -> Option<&str> {
    let rest = data_url.strip_prefix("data:")?;
    rest.split(';').next().filter(|mime| !mime.is_empty())
}

/// Data URLを元のバイト列に復元する
///
/// 構造マーカー（`data:`プレフィックスと`;base64,`区切り）を欠く入力は
/// MalformedDataUrlとして報告する。切り詰めたバイト列を黙って返すことはない。
pub fn decode_data_url(data_url: &str) -> Result<DecodedImage> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| CodecError::MalformedDataUrl("data:プレフィックスがありません".into()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| CodecError::MalformedDataUrl("ヘッダとペイロードの区切りがありません".into()))?;

    let mime_type = header
        .strip_suffix(";base64")
        .filter(|mime| !mime.is_empty())
        .ok_or_else(|| CodecError::MalformedDataUrl("base64マーカーがありません".into()))?;

    let bytes = STANDARD.decode(payload)?;

    Ok(DecodedImage {
        mime_type: mime_type.to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_jpeg() {
        let original: Vec<u8> = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        let encoded = encode_data_url("image/jpeg", &original);
        assert!(encoded.starts_with("data:image/jpeg;base64,"));

        let decoded = decode_data_url(&encoded).unwrap();
        assert_eq!(decoded.bytes, original);
        assert_eq!(decoded.mime_type, "image/jpeg");
    }

    #[test]
    fn test_roundtrip_empty_payload() {
        let encoded = encode_data_url("image/png", &[]);
        let decoded = decode_data_url(&encoded).unwrap();
        assert!(decoded.bytes.is_empty());
        assert_eq!(decoded.mime_type, "image/png");
    }

    #[test]
    fn test_mime_type_of_png() {
        let data_url = "data:image/png;base64,iVBORw0KGgo=";
        assert_eq!(mime_type_of(data_url), Some("image/png"));
    }

    #[test]
    fn test_mime_type_of_invalid() {
        assert_eq!(mime_type_of("invalid-data-url"), None);
        assert_eq!(mime_type_of("data:;base64,aaaa"), None);
    }

    #[test]
    fn test_decode_missing_prefix() {
        let result = decode_data_url("image/jpeg;base64,/9j/4AAQ");
        assert!(matches!(result, Err(CodecError::MalformedDataUrl(_))));
    }

    #[test]
    fn test_decode_missing_separator() {
        let result = decode_data_url("data:image/jpeg;base64");
        assert!(matches!(result, Err(CodecError::MalformedDataUrl(_))));
    }

    #[test]
    fn test_decode_missing_base64_marker() {
        let result = decode_data_url("data:image/jpeg,/9j/4AAQ");
        assert!(matches!(result, Err(CodecError::MalformedDataUrl(_))));
    }

    #[test]
    fn test_decode_invalid_payload() {
        let result = decode_data_url("data:image/jpeg;base64,???");
        assert!(matches!(result, Err(CodecError::Base64(_))));
    }
}
