//! 进程级配置：存储根目录、目标分辨率、目标抽帧率

use std::env;
use std::path::PathBuf;

pub const DEFAULT_STORAGE_ROOT: &str = "video_database";
pub const DEFAULT_VIDEO_RESOLUTION: u32 = 720;
pub const DEFAULT_VIDEO_FPS: f64 = 5.0;

/// 环境变量：Netscape 格式的 cookies 文件路径（可选）
pub const COOKIES_ENV: &str = "YOUTUBE_COOKIES";

#[derive(Debug, Clone)]
pub struct Config {
    /// 视频数据库根目录
    pub storage_root: PathBuf,
    /// 下载时的最大画面高度
    pub video_resolution: u32,
    /// 抽帧的目标帧率
    pub video_fps: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            video_resolution: DEFAULT_VIDEO_RESOLUTION,
            video_fps: DEFAULT_VIDEO_FPS,
        }
    }
}

impl Config {
    /// 从环境变量读取配置，解析失败时回退到默认值
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = env::var("VDB_STORAGE_ROOT") {
            if !root.is_empty() {
                config.storage_root = PathBuf::from(root);
            }
        }
        if let Ok(raw) = env::var("VDB_VIDEO_RESOLUTION") {
            if let Ok(value) = raw.parse() {
                config.video_resolution = value;
            }
        }
        if let Ok(raw) = env::var("VDB_VIDEO_FPS") {
            if let Ok(value) = raw.parse() {
                config.video_fps = value;
            }
        }
        config
    }

    /// cookies 文件路径（若设置且文件存在）
    pub fn cookies_file() -> Option<PathBuf> {
        let raw = env::var(COOKIES_ENV).ok()?;
        if raw.is_empty() {
            return None;
        }
        let path = PathBuf::from(raw);
        if path.is_file() {
            Some(path)
        } else {
            log::warn!("cookies file not found: {}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage_root, PathBuf::from("video_database"));
        assert_eq!(config.video_resolution, 720);
        assert_eq!(config.video_fps, 5.0);
    }
}
