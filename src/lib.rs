//! Image Uploader Rust
//!
//! 画像アップロードのシミュレーションと、アップロード済み画像グループの
//! クライアントサイド永続化・整合性維持を担うコアライブラリ。
//! 表示層（ドラッグ&ドロップ捕捉、プログレスバー描画、トースト表示）は
//! 持たず、データAPIとイベント通知だけを公開する。

pub mod cli;
pub mod config;
pub mod error;
pub mod notify;
pub mod repository;
pub mod selection;
pub mod store;
pub mod uploader;

pub use image_uploader_common as common;
