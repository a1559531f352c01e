//! 视频数据库的磁盘布局
//!
//! `{root}/raw/{id}.{ext}` 放原始视频和同名 `.srt` 边车字幕，
//! `{root}/{id}/frames/` 放抽出的帧。目录按需创建，从不清理。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct VideoStore {
    root: PathBuf,
}

impl VideoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn ensure_raw_dir(&self) -> io::Result<PathBuf> {
        let dir = self.raw_dir();
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn frames_dir(&self, video_stem: &str) -> PathBuf {
        self.root.join(video_stem).join("frames")
    }

    pub fn ensure_frames_dir(&self, video_stem: &str) -> io::Result<PathBuf> {
        let dir = self.frames_dir(video_stem);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// 把本地视频原样拷贝进 raw 目录，保留原文件名
    pub fn copy_into_raw(&self, source: &Path) -> io::Result<PathBuf> {
        let raw_dir = self.ensure_raw_dir()?;
        let file_name = source.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "source has no file name")
        })?;
        let destination = raw_dir.join(file_name);
        fs::copy(source, &destination)?;
        Ok(destination)
    }

    /// 边车字幕路径 = 视频路径换成 .srt 扩展名
    pub fn sidecar_srt_path(video_path: &Path) -> PathBuf {
        video_path.with_extension("srt")
    }
}
