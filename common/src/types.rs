//! 画像グループの型定義
//!
//! CLIと永続ストアで共有される型:
//! - StoredImage: アップロード済みの画像1枚
//! - ImageGroup: 1回のアップロードで確定した画像のまとまり

use serde::{Deserialize, Serialize};

/// アップロード済みの画像1枚
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredImage {
    /// グループ内で一意なID（ファイル名+サイズ+更新時刻+乱数サフィックス）
    pub id: String,

    /// 元のファイル名（表示用）
    pub name: String,

    /// MIMEタイプ（例: "image/jpeg"）
    pub mime_type: String,

    /// Data URL形式でエンコードされたファイル内容
    pub data: String,

    /// 元のバイト数（表示用キャッシュ。dataから再計算はしない）
    pub size_bytes: u64,
}

/// 1回のアップロードで確定した画像グループ
///
/// timestampはエポックミリ秒で、グループの識別キーを兼ねる。
/// 存在している間は必ず1枚以上の画像を持つ。メンバーの追加はなく、
/// 減るのは明示的な削除操作のときだけ。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageGroup {
    pub timestamp: i64,
    pub images: Vec<StoredImage>,
}

impl ImageGroup {
    /// グループ内の画像の合計バイト数（表示用）
    pub fn total_size_bytes(&self) -> u64 {
        self.images.iter().map(|img| img.size_bytes).sum()
    }
}
