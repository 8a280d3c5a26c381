//! 永続ストア
//!
//! 画像グループの耐久保存を抽象化する。バックエンドは2系統:
//! - snapshot: 全グループを名前空間ごとの1ファイルに直列化する
//!   （同期的な文字列ストア相当）
//! - keyed: グループごとに1レコードずつ保存する
//!   （非同期なオブジェクトストア相当）
//!
//! どちらもリポジトリからは同じ契約に見える。破損した保存データは
//! 読み捨てて物理的にも初期化し、呼び出し側へはフラグで伝える。
//! ストアを書き換えるのはリポジトリだけ。

mod keyed;
mod snapshot;

pub use keyed::KeyedStore;
pub use snapshot::SnapshotStore;

use crate::config::{Config, StorageBackend};
use crate::error::{Result, UploaderError};
use async_trait::async_trait;
use image_uploader_common::ImageGroup;
use std::sync::Arc;

/// load_allの結果
#[derive(Debug, Default)]
pub struct LoadReport {
    pub groups: Vec<ImageGroup>,

    /// 破損データを破棄・初期化したか
    pub corruption_reset: bool,
}

/// 画像グループの永続ストア
///
/// save_group / delete_groupのfull_stateは変更適用後の全グループ
/// （メモリ上の正とする状態、timestamp昇順）。snapshot系はこれを丸ごと
/// 書き直して個別グループ引数を無視し、keyed系は該当レコードだけを触って
/// full_stateを無視する。
#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn load_all(&self) -> Result<LoadReport>;

    async fn save_group(&self, group: &ImageGroup, full_state: &[ImageGroup]) -> Result<()>;

    async fn delete_group(&self, timestamp: i64, full_state: &[ImageGroup]) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// 永続化できない環境でのフォールバック
///
/// 読み出しは常に空、書き込みは常に失敗を報告する（メモリのみモード）。
#[derive(Debug, Default)]
pub struct UnavailableStore;

#[async_trait]
impl GroupStore for UnavailableStore {
    async fn load_all(&self) -> Result<LoadReport> {
        Ok(LoadReport::default())
    }

    async fn save_group(&self, _group: &ImageGroup, _full_state: &[ImageGroup]) -> Result<()> {
        Err(UploaderError::StoreUnavailable("メモリのみモード".into()))
    }

    async fn delete_group(&self, _timestamp: i64, _full_state: &[ImageGroup]) -> Result<()> {
        Err(UploaderError::StoreUnavailable("メモリのみモード".into()))
    }

    async fn clear(&self) -> Result<()> {
        // 耐久側には何も残っていないので削除は自明に成功
        Ok(())
    }
}

/// 設定からストアを開く
///
/// データディレクトリを用意できない場合はUnavailableStoreに退避し、
/// メモリのみで継続する。
pub fn open(config: &Config) -> Arc<dyn GroupStore> {
    match try_open(config) {
        Ok(store) => store,
        Err(e) => {
            log::warn!("永続ストアを開けません。メモリのみで継続します: {}", e);
            Arc::new(UnavailableStore)
        }
    }
}

fn try_open(config: &Config) -> Result<Arc<dyn GroupStore>> {
    let data_dir = config.resolved_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    Ok(match config.backend {
        StorageBackend::Snapshot => Arc::new(SnapshotStore::new(
            &data_dir,
            &config.storage_namespace,
            config.max_storage_bytes,
        )),
        StorageBackend::Keyed => Arc::new(KeyedStore::new(
            &data_dir,
            &config.storage_namespace,
            config.max_storage_bytes,
        )),
    })
}
