use crate::config::StorageBackend;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "image-uploader")]
#[command(about = "画像アップロード・ギャラリー管理ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像を選択して疑似アップロードし、グループとして保存
    Upload {
        /// 画像ファイルのパス
        files: Vec<PathBuf>,

        /// フォルダ直下の画像をまとめて選択（再帰しない）
        #[arg(short = 'd', long)]
        folder: Option<PathBuf>,

        /// 進捗タイマーのティック間隔（ミリ秒）
        #[arg(long, default_value = "200")]
        tick_millis: u64,
    },

    /// 保存済みグループを新しい順に表示
    List {
        /// 各画像のデコード結果も確認する
        #[arg(long)]
        verify: bool,
    },

    /// グループ内の画像1枚を削除
    DeleteImage {
        /// グループのタイムスタンプ（エポックミリ秒）
        #[arg(required = true)]
        group: i64,

        /// 画像ID
        #[arg(required = true)]
        image_id: String,
    },

    /// グループを丸ごと削除
    DeleteGroup {
        /// グループのタイムスタンプ（エポックミリ秒）
        #[arg(required = true)]
        group: i64,
    },

    /// 全グループを削除（確認あり）
    Clear {
        /// 確認をスキップ
        #[arg(short, long)]
        yes: bool,
    },

    /// 設定を表示/編集
    Config {
        /// 最大ファイルサイズ（バイト）を設定
        #[arg(long)]
        set_max_file_size: Option<u64>,

        /// ストアのバックエンドを設定 (snapshot/keyed)
        #[arg(long)]
        set_backend: Option<StorageBackend>,

        /// データ保存先ディレクトリを設定
        #[arg(long)]
        set_data_dir: Option<PathBuf>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

/// バイト数を読みやすい単位で整形する
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// グループのタイムスタンプを表示用に整形する
pub fn format_timestamp(timestamp_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_millis)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| timestamp_millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512.00 Bytes");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_format_timestamp_invalid_falls_back() {
        // ミリ秒として表現できない値はそのまま数値で返す
        assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
    }
}
