//! 视频入库：远程下载或本地拷贝到 raw 目录

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::config::Config;
use crate::core::downloader::{DownloadError, YtDlp};
use crate::core::is_youtube_url;
use crate::core::store::VideoStore;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("provided URL is not a valid YouTube link: {0}")]
    NotYoutube(String),
    #[error("source path '{0}' does not exist")]
    MissingSource(PathBuf),
    #[error("source path '{0}' is a directory, not a file")]
    SourceIsDirectory(PathBuf),
    #[error("a subtitle source is required when subtitles are requested for a local video")]
    MissingSubtitleSource,
    #[error("only SRT subtitle files are supported for local videos, got '{0}'")]
    UnsupportedSubtitleFormat(PathBuf),
    #[error("subtitle file '{0}' not found")]
    MissingSubtitleFile(PathBuf),
    #[error("downloaded subtitle for '{0}' not found in the raw directory")]
    DownloadedSubtitleMissing(String),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 把视频加载进视频数据库，返回落盘后的绝对路径。
///
/// `source` 是 YouTube 链接或本地文件路径。`subtitle` 为 Some 时同时准备
/// 边车字幕：远程视频传语言代码（如 "en"），本地视频传 `.srt` 文件路径。
pub fn load_video(
    config: &Config,
    source: &str,
    subtitle: Option<&str>,
) -> Result<PathBuf, LoadError> {
    let store = VideoStore::new(&config.storage_root);

    if source.starts_with("http://") || source.starts_with("https://") {
        load_remote(config, &store, source, subtitle)
    } else {
        load_local(&store, Path::new(source), subtitle)
    }
}

fn load_remote(
    config: &Config,
    store: &VideoStore,
    url: &str,
    sub_lang: Option<&str>,
) -> Result<PathBuf, LoadError> {
    if !is_youtube_url(url) {
        return Err(LoadError::NotYoutube(url.to_string()));
    }
    let raw_dir = store.ensure_raw_dir()?;
    let downloader = YtDlp::new(config);

    let probed = downloader.probe(url)?;
    downloader.download(url, &raw_dir, sub_lang)?;

    // merge-output-format=mp4 决定了最终扩展名
    let video_path = raw_dir.join(format!("{}.mp4", probed.id));
    let video_path = if video_path.is_file() {
        video_path
    } else {
        raw_dir.join(format!("{}.{}", probed.id, probed.ext))
    };

    if sub_lang.is_some() {
        adopt_downloaded_subtitle(&raw_dir, &probed.id, &video_path)?;
    }

    info!("stored remote video at {}", video_path.display());
    Ok(fs::canonicalize(video_path)?)
}

/// yt-dlp 写出的字幕叫 `{id}.{lang}.srt`，统一改名成 `{id}.srt`
fn adopt_downloaded_subtitle(
    raw_dir: &Path,
    video_id: &str,
    video_path: &Path,
) -> Result<(), LoadError> {
    let sidecar = VideoStore::sidecar_srt_path(video_path);
    for entry in fs::read_dir(raw_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(video_id) && name.ends_with(".srt") && entry.path() != sidecar {
            fs::rename(entry.path(), &sidecar)?;
            return Ok(());
        }
    }
    if sidecar.is_file() {
        return Ok(());
    }
    Err(LoadError::DownloadedSubtitleMissing(video_id.to_string()))
}

fn load_local(
    store: &VideoStore,
    source: &Path,
    subtitle: Option<&str>,
) -> Result<PathBuf, LoadError> {
    if !source.exists() {
        return Err(LoadError::MissingSource(source.to_path_buf()));
    }
    if !source.is_file() {
        return Err(LoadError::SourceIsDirectory(source.to_path_buf()));
    }

    // 字幕先校验再动盘，避免拷了视频却在字幕上报错
    let subtitle_source = match subtitle {
        Some(raw) if raw.is_empty() => return Err(LoadError::MissingSubtitleSource),
        Some(raw) => {
            let path = PathBuf::from(raw);
            let is_srt = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("srt"))
                .unwrap_or(false);
            if !is_srt {
                return Err(LoadError::UnsupportedSubtitleFormat(path));
            }
            if !path.is_file() {
                return Err(LoadError::MissingSubtitleFile(path));
            }
            Some(path)
        }
        None => None,
    };

    let video_path = store.copy_into_raw(source)?;
    if let Some(subtitle_path) = subtitle_source {
        let sidecar = VideoStore::sidecar_srt_path(&video_path);
        fs::copy(&subtitle_path, &sidecar)?;
        info!("stored sidecar subtitle at {}", sidecar.display());
    }

    info!("stored local video at {}", video_path.display());
    Ok(fs::canonicalize(video_path)?)
}
