//! yt-dlp 子进程封装

use std::path::{Path, PathBuf};
use std::process::Command;

use log::info;
use thiserror::Error;

use crate::config::Config;
use crate::core::BROWSER_USER_AGENT;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to run yt-dlp (is it installed and on PATH?): {0}")]
    Spawn(#[from] std::io::Error),
    #[error("yt-dlp exited with {status}: {stderr}")]
    Failed { status: i32, stderr: String },
    #[error("yt-dlp metadata was not valid JSON: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("yt-dlp metadata is missing the video id")]
    MissingVideoId,
}

/// probe 出的视频标识，决定落盘后的文件名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedVideo {
    pub id: String,
    pub ext: String,
}

pub struct YtDlp {
    binary: PathBuf,
    resolution: u32,
    cookies: Option<PathBuf>,
}

impl YtDlp {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            resolution: config.video_resolution,
            cookies: Config::cookies_file(),
        }
    }

    /// 先拉元数据确定 id / 扩展名，下载后的路径才可预知
    pub fn probe(&self, url: &str) -> Result<ProbedVideo, DownloadError> {
        let output = Command::new(&self.binary)
            .args(["--dump-single-json", "--no-playlist", "--no-warnings"])
            .args(self.cookie_args())
            .arg(url)
            .output()?;
        if !output.status.success() {
            return Err(failed(&output));
        }
        parse_probe(&output.stdout)
    }

    /// 把视频下载进 raw 目录；`sub_lang` 为 Some 时顺带写出字幕
    pub fn download(
        &self,
        url: &str,
        raw_dir: &Path,
        sub_lang: Option<&str>,
    ) -> Result<(), DownloadError> {
        let args = self.download_args(url, raw_dir, sub_lang);
        info!("downloading {} into {}", url, raw_dir.display());
        let output = Command::new(&self.binary).args(&args).output()?;
        if !output.status.success() {
            return Err(failed(&output));
        }
        Ok(())
    }

    fn download_args(&self, url: &str, raw_dir: &Path, sub_lang: Option<&str>) -> Vec<String> {
        let format = format!(
            "bestvideo[height<={r}][ext=mp4]/best[height<={r}][ext=mp4]",
            r = self.resolution
        );
        let template = raw_dir.join("%(id)s.%(ext)s");

        let mut args = vec![
            "-f".to_string(),
            format,
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--user-agent".to_string(),
            BROWSER_USER_AGENT.to_string(),
            "--extractor-args".to_string(),
            "youtube:player_client=android,web".to_string(),
        ];
        if let Some(lang) = sub_lang {
            args.push("--write-subs".to_string());
            args.push("--sub-format".to_string());
            args.push("srt".to_string());
            args.push("--sub-langs".to_string());
            args.push(lang.to_string());
        }
        args.extend(self.cookie_args());
        args.push(url.to_string());
        args
    }

    fn cookie_args(&self) -> Vec<String> {
        match &self.cookies {
            Some(path) => vec![
                "--cookies".to_string(),
                path.to_string_lossy().into_owned(),
            ],
            None => Vec::new(),
        }
    }
}

fn parse_probe(stdout: &[u8]) -> Result<ProbedVideo, DownloadError> {
    let metadata: serde_json::Value = serde_json::from_slice(stdout)?;
    let id = metadata
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or(DownloadError::MissingVideoId)?
        .to_string();
    // merge-output-format 固定产出 mp4，元数据里的 ext 只作回退
    let ext = metadata
        .get("ext")
        .and_then(|v| v.as_str())
        .unwrap_or("mp4")
        .to_string();
    Ok(ProbedVideo { id, ext })
}

fn failed(output: &std::process::Output) -> DownloadError {
    DownloadError::Failed {
        status: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_downloader(cookies: Option<PathBuf>) -> YtDlp {
        YtDlp {
            binary: PathBuf::from("yt-dlp"),
            resolution: 480,
            cookies,
        }
    }

    #[test]
    fn test_parse_probe_extracts_id_and_ext() {
        let raw = br#"{"id": "PQFQ-3d2J-8", "ext": "webm", "title": "demo"}"#;
        let probed = parse_probe(raw).unwrap();
        assert_eq!(probed.id, "PQFQ-3d2J-8");
        assert_eq!(probed.ext, "webm");
    }

    #[test]
    fn test_parse_probe_defaults_ext_to_mp4() {
        let probed = parse_probe(br#"{"id": "abc"}"#).unwrap();
        assert_eq!(probed.ext, "mp4");
    }

    #[test]
    fn test_parse_probe_missing_id() {
        let err = parse_probe(br#"{"title": "demo"}"#).unwrap_err();
        assert!(matches!(err, DownloadError::MissingVideoId));
    }

    #[test]
    fn test_download_args_resolution_and_template() {
        let args = test_downloader(None).download_args(
            "https://youtu.be/abc",
            Path::new("/data/raw"),
            None,
        );
        assert_eq!(args[0], "-f");
        assert_eq!(
            args[1],
            "bestvideo[height<=480][ext=mp4]/best[height<=480][ext=mp4]"
        );
        assert!(args.contains(&"/data/raw/%(id)s.%(ext)s".to_string()));
        assert!(!args.contains(&"--write-subs".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/abc");
    }

    #[test]
    fn test_download_args_with_subtitles() {
        let args = test_downloader(None).download_args(
            "https://youtu.be/abc",
            Path::new("/data/raw"),
            Some("en"),
        );
        assert!(args.contains(&"--write-subs".to_string()));
        let pos = args.iter().position(|a| a == "--sub-langs").unwrap();
        assert_eq!(args[pos + 1], "en");
    }

    #[test]
    fn test_download_args_with_cookies() {
        let args = test_downloader(Some(PathBuf::from("/tmp/cookies.txt"))).download_args(
            "https://youtu.be/abc",
            Path::new("/data/raw"),
            None,
        );
        let pos = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[pos + 1], "/tmp/cookies.txt");
    }
}
