//! 選択バッファ
//!
//! 検証済み・未コミットのファイルを一時的に保持する。永続化はせず、
//! コミット成功・個別削除・明示的なクリアで消える。

use crate::notify::{EventSink, UploaderEvent};
use image_uploader_common::{validate, FileMeta, UploadLimits};
use rand::distr::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

/// 選択中のファイル1件
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub id: String,
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

pub struct SelectionBuffer {
    limits: UploadLimits,
    sink: Arc<dyn EventSink>,
    entries: Vec<SelectedFile>,
}

impl SelectionBuffer {
    pub fn new(limits: UploadLimits, sink: Arc<dyn EventSink>) -> Self {
        Self {
            limits,
            sink,
            entries: Vec::new(),
        }
    }

    /// 候補ファイルを検証して追加する。受理した件数を返す。
    /// 却下は1ファイルごとにイベントで報告し、残りの処理は続行する。
    pub fn add_paths(&mut self, paths: &[PathBuf]) -> usize {
        let mut accepted = 0;
        for path in paths {
            let (meta, modified_millis) = match inspect(path) {
                Ok(inspected) => inspected,
                Err(e) => {
                    log::warn!("ファイルを読めないためスキップします ({}): {}", path.display(), e);
                    continue;
                }
            };

            match validate(&meta, &self.limits) {
                Ok(()) => {
                    self.entries.push(make_entry(path, &meta, modified_millis));
                    accepted += 1;
                }
                Err(reason) => {
                    self.sink.notify(UploaderEvent::ValidationRejected {
                        file_name: meta.name,
                        reason,
                    });
                }
            }
        }
        accepted
    }

    /// IDで1件取り除く。見つかったらtrue
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 選択順のままの一覧
    pub fn snapshot(&self) -> &[SelectedFile] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 合計バイト数（表示用）
    pub fn total_size_bytes(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size_bytes).sum()
    }
}

/// ファイルのメタデータを調べる
///
/// MIMEタイプは内容の先頭バイトから判別し、判別できなければ拡張子で
/// 補う（ブラウザのfile.type相当）。戻り値は(メタデータ, 更新時刻ミリ秒)。
fn inspect(path: &Path) -> std::io::Result<(FileMeta, u128)> {
    let metadata = std::fs::metadata(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mime_type = sniff_mime(path)
        .or_else(|| mime_from_extension(path))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let modified_millis = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis())
        .unwrap_or(0);

    Ok((
        FileMeta {
            name,
            mime_type,
            size_bytes: metadata.len(),
        },
        modified_millis,
    ))
}

/// 先頭バイトのマジックナンバーからMIMEタイプを判別する
fn sniff_mime(path: &Path) -> Option<String> {
    use std::io::Read;

    let mut head = [0u8; 64];
    let mut file = std::fs::File::open(path).ok()?;
    let n = file.read(&mut head).ok()?;
    image::guess_format(&head[..n])
        .ok()
        .map(|format| format.to_mime_type().to_string())
}

/// 拡張子からのフォールバック判定
fn mime_from_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime.to_string())
}

/// 一意なIDを振って選択エントリを作る
///
/// ID形式は「ファイル名_サイズ_更新時刻ミリ秒_乱数6桁」。
fn make_entry(path: &Path, meta: &FileMeta, modified_millis: u128) -> SelectedFile {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    SelectedFile {
        id: format!(
            "{}_{}_{}_{}",
            meta.name,
            meta.size_bytes,
            modified_millis,
            suffix.to_lowercase()
        ),
        path: path.to_path_buf(),
        file_name: meta.name.clone(),
        mime_type: meta.mime_type.clone(),
        size_bytes: meta.size_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemorySink;
    use image_uploader_common::RejectReason;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn write_png(dir: &Path, name: &str, total_len: usize) -> PathBuf {
        let path = dir.join(name);
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(total_len, 0);
        std::fs::write(&path, &bytes).unwrap();
        path
    }

    fn buffer_with_sink() -> (SelectionBuffer, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let buffer = SelectionBuffer::new(UploadLimits::default(), sink.clone());
        (buffer, sink)
    }

    #[test]
    fn test_add_accepts_valid_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 64);

        let (mut buffer, sink) = buffer_with_sink();
        let accepted = buffer.add_paths(&[path]);

        assert_eq!(accepted, 1);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.snapshot()[0].mime_type, "image/png");
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_add_rejects_wrong_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readme.txt");
        std::fs::write(&path, b"not an image").unwrap();

        let (mut buffer, sink) = buffer_with_sink();
        let accepted = buffer.add_paths(&[path]);

        assert_eq!(accepted, 0);
        assert!(buffer.is_empty());
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            UploaderEvent::ValidationRejected {
                reason: RejectReason::InvalidType { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_add_rejects_empty_file() {
        // 中身がなくても拡張子でpngと判定され、空ファイルとして却下される
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        std::fs::write(&path, b"").unwrap();

        let (mut buffer, sink) = buffer_with_sink();
        buffer.add_paths(&[path]);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            UploaderEvent::ValidationRejected {
                reason: RejectReason::EmptyFile,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let (mut buffer, sink) = buffer_with_sink();
        let accepted = buffer.add_paths(&[PathBuf::from("/nonexistent/x.png")]);
        assert_eq!(accepted, 0);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_remove_by_id_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 32);
        let b = write_png(dir.path(), "b.png", 32);
        let c = write_png(dir.path(), "c.png", 32);

        let (mut buffer, _sink) = buffer_with_sink();
        buffer.add_paths(&[a, b, c]);
        assert_eq!(buffer.len(), 3);

        // 選択順が保たれる
        let names: Vec<&str> = buffer
            .snapshot()
            .iter()
            .map(|e| e.file_name.as_str())
            .collect();
        assert_eq!(names, ["a.png", "b.png", "c.png"]);

        let middle_id = buffer.snapshot()[1].id.clone();
        assert!(buffer.remove_by_id(&middle_id));
        assert!(!buffer.remove_by_id(&middle_id));
        assert_eq!(buffer.len(), 2);

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_ids_are_unique_for_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 32);

        let (mut buffer, _sink) = buffer_with_sink();
        buffer.add_paths(&[path.clone(), path]);
        assert_eq!(buffer.len(), 2);
        assert_ne!(buffer.snapshot()[0].id, buffer.snapshot()[1].id);
    }

    #[test]
    fn test_total_size_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 100);
        let b = write_png(dir.path(), "b.png", 200);

        let (mut buffer, _sink) = buffer_with_sink();
        buffer.add_paths(&[a, b]);
        assert_eq!(buffer.total_size_bytes(), 300);
    }
}
