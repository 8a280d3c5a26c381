use crate::error::{Result, UploaderError};
use clap::ValueEnum;
use image_uploader_common::UploadLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ストレージ容量上限のデフォルト（10MiB）
///
/// ブラウザ環境では実行環境が暗黙に課す上限に相当する。ネイティブでは
/// 明示的な設定値として両バックエンドが同じ値を強制する。
const DEFAULT_STORAGE_QUOTA: u64 = 10 * 1024 * 1024;

/// デフォルトの保存名前空間（ストレージキー）
const DEFAULT_NAMESPACE: &str = "uploadedImagesData";

/// 永続ストアのバックエンド方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 全グループを名前空間ごとの1つのJSONブロブに直列化する
    #[default]
    Snapshot,
    /// グループごとに1レコードずつ保存する
    Keyed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// 検証設定（最大ファイルサイズ・許可MIMEタイプ）
    pub limits: UploadLimits,

    /// 保存名前空間
    pub storage_namespace: String,

    /// データ保存先ディレクトリ（未指定ならプラットフォームの既定位置）
    pub data_dir: Option<PathBuf>,

    /// バックエンド方式
    pub backend: StorageBackend,

    /// ストレージ容量の上限（バイト）
    pub max_storage_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: UploadLimits::default(),
            storage_namespace: DEFAULT_NAMESPACE.to_string(),
            data_dir: None,
            backend: StorageBackend::default(),
            max_storage_bytes: DEFAULT_STORAGE_QUOTA,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| UploaderError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("image-uploader").join("config.json"))
    }

    /// ストアのデータ保存先を解決する
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_dir()
            .ok_or_else(|| UploaderError::Config("データディレクトリが見つかりません".into()))?;
        Ok(base.join("image-uploader"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage_namespace, "uploadedImagesData");
        assert_eq!(config.limits.max_file_size, 5 * 1024 * 1024);
        assert_eq!(config.backend, StorageBackend::Snapshot);
        assert_eq!(config.max_storage_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.backend = StorageBackend::Keyed;
        config.max_storage_bytes = 1024;

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"backend\":\"keyed\""));

        let loaded: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.backend, StorageBackend::Keyed);
        assert_eq!(loaded.max_storage_bytes, 1024);
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let mut config = Config::default();
        config.data_dir = Some(PathBuf::from("/tmp/uploader-data"));
        assert_eq!(
            config.resolved_data_dir().unwrap(),
            PathBuf::from("/tmp/uploader-data")
        );
    }
}
