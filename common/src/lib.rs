//! Image Uploader Common Library
//!
//! CLIとWebフロントエンドで共有される型とユーティリティ

pub mod types;
pub mod codec;
pub mod validation;
pub mod error;

pub use types::{ImageGroup, StoredImage};
pub use codec::{decode_data_url, encode_data_url, mime_type_of, DecodedImage};
pub use validation::{validate, FileMeta, RejectReason, UploadLimits};
pub use error::{CodecError, Result};
