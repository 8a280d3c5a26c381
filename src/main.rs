use clap::Parser;
use image_uploader_rust::{cli, config, error, notify, repository, selection, store, uploader};

use cli::{Cli, Commands};
use config::Config;
use error::{Result, UploaderError};
use image_uploader_common::decode_data_url;
use indicatif::{ProgressBar, ProgressStyle};
use notify::{EventSink, UploaderEvent};
use repository::GroupRepository;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// イベントをトースト風のコンソール表示にするシンク
struct ConsoleSink {
    progress: Option<ProgressBar>,
}

impl ConsoleSink {
    fn new() -> Self {
        Self { progress: None }
    }

    fn with_progress(bar: ProgressBar) -> Self {
        Self {
            progress: Some(bar),
        }
    }

    fn toast(&self, message: String) {
        match &self.progress {
            Some(bar) if !bar.is_finished() => bar.println(message),
            _ => println!("{}", message),
        }
    }
}

impl EventSink for ConsoleSink {
    fn notify(&self, event: UploaderEvent) {
        match event {
            UploaderEvent::UploadProgress { percent } => {
                if let Some(bar) = &self.progress {
                    bar.set_position(percent as u64);
                }
            }
            UploaderEvent::ValidationRejected { file_name, reason } => {
                self.toast(format!("⚠ {}: {}", file_name, reason));
            }
            UploaderEvent::UploadCompleted { timestamp, images } => {
                self.toast(format!(
                    "✔ {}枚の画像をアップロードしました（グループ {}）",
                    images.len(),
                    timestamp
                ));
            }
            UploaderEvent::UploadCancelled => {
                self.toast("⚠ アップロードを中断しました".to_string());
            }
            UploaderEvent::EncodingFailed { file_name, detail } => {
                self.toast(format!(
                    "⚠ エンコードに失敗したためスキップ: {} ({})",
                    file_name, detail
                ));
            }
            UploaderEvent::QuotaExceeded => {
                self.toast(
                    "⚠ ストレージ容量の上限に達しました。今回の内容は再起動後に残らない可能性があります"
                        .to_string(),
                );
            }
            UploaderEvent::StoreCorrupted => {
                self.toast("⚠ 破損した保存データを初期化しました".to_string());
            }
            UploaderEvent::StoreUnavailable => {
                self.toast("⚠ 永続ストレージが利用できません。メモリのみで継続します".to_string());
            }
            UploaderEvent::ImageDeleted { image_id, .. } => {
                self.toast(format!("✔ 画像を削除しました: {}", image_id));
            }
            UploaderEvent::GroupDeleted { timestamp } => {
                self.toast(format!("✔ グループを削除しました: {}", timestamp));
            }
            UploaderEvent::AllDeleted => {
                self.toast("✔ すべての画像を削除しました".to_string());
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::init();
    }

    let config = Config::load()?;

    match cli.command {
        Commands::Upload {
            files,
            folder,
            tick_millis,
        } => {
            println!("📤 image-uploader - アップロード\n");

            let mut paths = files;
            if let Some(dir) = folder {
                paths.extend(scan_folder(&dir)?);
            }
            if paths.is_empty() {
                return Err(UploaderError::InvalidState(
                    "アップロードするファイルを指定してください".into(),
                ));
            }

            let bar = ProgressBar::new(100);
            bar.set_style(ProgressStyle::default_bar());
            let sink: Arc<dyn EventSink> = Arc::new(ConsoleSink::with_progress(bar.clone()));

            // 1. 選択と検証
            println!("[1/3] ファイルを検証中...");
            let mut buffer = selection::SelectionBuffer::new(config.limits.clone(), sink.clone());
            let accepted = buffer.add_paths(&paths);
            if buffer.is_empty() {
                bar.finish_and_clear();
                return Err(UploaderError::InvalidState(
                    "アップロードできるファイルがありません".into(),
                ));
            }
            println!(
                "✔ {}ファイル / 合計 {}\n",
                accepted,
                cli::format_file_size(buffer.total_size_bytes())
            );

            // 2. ギャラリー読み込み
            println!("[2/3] ギャラリーを読み込み中...");
            let repository = open_repository(&config, sink.clone()).await?;
            println!("✔ 読み込み完了\n");

            // 3. 疑似アップロード（Ctrl-Cで中断）
            println!("[3/3] アップロード中...");
            let simulator = Arc::new(uploader::UploadSimulator::with_tick_interval(
                repository,
                sink,
                std::time::Duration::from_millis(tick_millis.max(1)),
            ));
            let canceller = simulator.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    canceller.cancel();
                }
            });

            let outcome = simulator.start(&mut buffer).await?;
            bar.finish_and_clear();

            match outcome {
                uploader::UploadOutcome::Committed(receipt) => {
                    if receipt.durable {
                        println!("\n✅ アップロード完了（グループ {}）", receipt.timestamp);
                    } else {
                        println!(
                            "\n✅ アップロード完了（グループ {}、永続化は失敗）",
                            receipt.timestamp
                        );
                    }
                }
                uploader::UploadOutcome::Cancelled => {
                    println!("\nアップロードは中断されました");
                }
                uploader::UploadOutcome::NothingEncoded => {
                    println!("\n⚠ エンコードできたファイルがなく、保存しませんでした");
                }
            }
        }

        Commands::List { verify } => {
            let sink: Arc<dyn EventSink> = Arc::new(ConsoleSink::new());
            let repository = open_repository(&config, sink).await?;

            let groups = repository.list().await?;
            if groups.is_empty() {
                println!("保存された画像はありません");
                return Ok(());
            }

            println!("📚 保存済みグループ: {}件\n", groups.len());
            for group in groups {
                println!(
                    "🗂 {} (timestamp: {}, {}枚, {})",
                    cli::format_timestamp(group.timestamp),
                    group.timestamp,
                    group.images.len(),
                    cli::format_file_size(group.total_size_bytes())
                );
                for image in &group.images {
                    println!(
                        "   - {} [{}] {} (id: {})",
                        image.name,
                        image.mime_type,
                        cli::format_file_size(image.size_bytes),
                        image.id
                    );
                    if verify {
                        let decoded = decode_data_url(&image.data)?;
                        println!(
                            "     デコード確認: {}バイト ({})",
                            decoded.bytes.len(),
                            decoded.mime_type
                        );
                    }
                }
                println!();
            }
        }

        Commands::DeleteImage { group, image_id } => {
            let sink: Arc<dyn EventSink> = Arc::new(ConsoleSink::new());
            let repository = open_repository(&config, sink).await?;
            repository.delete_image(group, &image_id).await?;
        }

        Commands::DeleteGroup { group } => {
            let sink: Arc<dyn EventSink> = Arc::new(ConsoleSink::new());
            let repository = open_repository(&config, sink).await?;
            repository.delete_group(group).await?;
        }

        Commands::Clear { yes } => {
            let confirmed = yes
                || dialoguer::Confirm::new()
                    .with_prompt("すべての画像グループを削除します。よろしいですか?")
                    .default(false)
                    .interact()
                    .map_err(|e| UploaderError::Prompt(e.to_string()))?;
            if !confirmed {
                println!("キャンセルしました");
                return Ok(());
            }

            let sink: Arc<dyn EventSink> = Arc::new(ConsoleSink::new());
            let repository = open_repository(&config, sink).await?;
            repository.delete_all().await?;
        }

        Commands::Config {
            set_max_file_size,
            set_backend,
            set_data_dir,
            show,
        } => {
            let mut config = config;
            let mut changed = false;

            if let Some(size) = set_max_file_size {
                config.limits.max_file_size = size;
                changed = true;
            }
            if let Some(backend) = set_backend {
                config.backend = backend;
                changed = true;
            }
            if let Some(dir) = set_data_dir {
                config.data_dir = Some(dir);
                changed = true;
            }
            if changed {
                config.save()?;
                println!("✔ 設定を保存しました");
            }

            if show || !changed {
                println!("設定:");
                println!(
                    "  最大ファイルサイズ: {}",
                    cli::format_file_size(config.limits.max_file_size)
                );
                println!("  許可タイプ: {}", config.limits.allowed_types.join(", "));
                println!("  名前空間: {}", config.storage_namespace);
                println!("  バックエンド: {:?}", config.backend);
                println!(
                    "  容量上限: {}",
                    cli::format_file_size(config.max_storage_bytes)
                );
                println!("  データ保存先: {}", config.resolved_data_dir()?.display());
            }
        }
    }

    Ok(())
}

/// ストアを開いてリポジトリを初期化する
async fn open_repository(config: &Config, sink: Arc<dyn EventSink>) -> Result<Arc<GroupRepository>> {
    let store = store::open(config);
    let repository = Arc::new(GroupRepository::new(store, sink));
    repository.initialize().await?;
    Ok(repository)
}

/// フォルダ直下の画像ファイルを集める（再帰しない）
fn scan_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "JPG", "JPEG", "PNG", "GIF"];

    if !folder.exists() {
        return Err(UploaderError::FolderNotFound(folder.display().to_string()));
    }

    let mut paths = Vec::new();
    for entry in walkdir::WalkDir::new(folder)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy();
            if IMAGE_EXTENSIONS.iter().any(|&e| e == ext) {
                paths.push(path.to_path_buf());
            }
        }
    }

    paths.sort();
    Ok(paths)
}
