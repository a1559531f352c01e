//! 远程字幕获取：观看页 → 字幕轨 URL → VTT → SRT

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::info;
use reqwest::blocking::Client;
use thiserror::Error;

use crate::config::Config;
use crate::core::retry::Backoff;
use crate::core::{is_youtube_url, BROWSER_USER_AGENT};
use crate::models::caption::CaptionEvent;

mod cookies;
mod parser;
pub mod srt;

#[derive(Debug, Error)]
pub enum SubtitleError {
    #[error("provided URL is not a valid YouTube link: {0}")]
    NotYoutube(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned HTTP {0}")]
    HttpStatus(u16),
    #[error("watch page carried no player response (likely a bot-check interstitial)")]
    PlayerResponseMissing,
    #[error("captions are disabled for this video")]
    CaptionsDisabled,
    #[error("no caption track matches language '{0}'")]
    NoMatchingTrack(String),
    #[error("caption track for '{0}' contained no caption events")]
    EmptyTrack(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("caption fetch failed after {attempts} attempts: {last}\n{hint}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<SubtitleError>,
        hint: String,
    },
}

impl SubtitleError {
    /// 网络错误、限流/服务端错误、风控拦截页视为可重试
    pub fn is_transient(&self) -> bool {
        match self {
            SubtitleError::Http(_) => true,
            SubtitleError::HttpStatus(code) => *code == 429 || *code >= 500,
            SubtitleError::PlayerResponseMissing => true,
            _ => false,
        }
    }
}

pub struct SubtitleFetcher {
    client: Client,
    backoff: Backoff,
    cookie_header: Option<String>,
}

impl SubtitleFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        let cookie_header = match Config::cookies_file() {
            Some(path) => match cookies::cookie_header_from_file(&path, "youtube.com") {
                Ok(Some(header)) => {
                    info!("🍪 using cookies from {}", path.display());
                    Some(header)
                }
                Ok(None) => {
                    log::warn!("cookies file {} has no youtube.com cookies", path.display());
                    None
                }
                Err(e) => {
                    log::warn!("could not read cookies file {}: {}", path.display(), e);
                    None
                }
            },
            None => None,
        };

        Self {
            client,
            backoff: Backoff::default(),
            cookie_header,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// 下载指定语言的字幕并以 SRT 写到 `output_path`。
    /// 语言代码 `auto` 表示优先自动生成的字幕轨。
    pub fn download_srt(
        &self,
        video_url: &str,
        lang: &str,
        output_path: &Path,
    ) -> Result<(), SubtitleError> {
        if !is_youtube_url(video_url) {
            return Err(SubtitleError::NotYoutube(video_url.to_string()));
        }
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let events = match self.backoff.run(
            |_attempt| self.fetch_caption_events(video_url, lang),
            SubtitleError::is_transient,
        ) {
            Ok(events) => events,
            Err(last) if last.is_transient() => {
                return Err(SubtitleError::RetriesExhausted {
                    attempts: self.backoff.attempts,
                    last: Box::new(last),
                    hint: self.remediation_hint(),
                });
            }
            Err(other) => return Err(other),
        };

        fs::write(output_path, srt::render_srt(&events))?;
        info!(
            "wrote {} caption entries to {}",
            events.len(),
            output_path.display()
        );
        Ok(())
    }

    fn fetch_caption_events(
        &self,
        video_url: &str,
        lang: &str,
    ) -> Result<Vec<CaptionEvent>, SubtitleError> {
        let html = self.fetch_text(video_url, "text/html")?;
        let player = parser::extract_player_response(&html)?;

        let tracks = player.caption_tracks();
        if tracks.is_empty() {
            return Err(SubtitleError::CaptionsDisabled);
        }
        let track = parser::select_track(tracks, lang)
            .ok_or_else(|| SubtitleError::NoMatchingTrack(lang.to_string()))?;
        info!(
            "using caption track '{}'{}",
            track.language_code,
            if track.is_auto_generated() { " (auto)" } else { "" }
        );

        let vtt = self.fetch_text(&vtt_url(&track.base_url), "text/vtt, */*")?;
        let events = srt::parse_vtt(&vtt);
        if events.is_empty() {
            return Err(SubtitleError::EmptyTrack(track.language_code.clone()));
        }
        Ok(events)
    }

    fn fetch_text(&self, url: &str, accept: &str) -> Result<String, SubtitleError> {
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .header(reqwest::header::REFERER, "https://www.youtube.com/");
        if let Some(header) = &self.cookie_header {
            request = request.header(reqwest::header::COOKIE, header.clone());
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SubtitleError::HttpStatus(status.as_u16()));
        }
        Ok(response.text()?)
    }

    fn remediation_hint(&self) -> String {
        if self.cookie_header.is_some() {
            "The cookies file may have expired (they rotate quickly); sign in to \
             YouTube again, re-export the file named by YOUTUBE_COOKIES, and retry. \
             Waiting 10-15 minutes can also clear upstream rate limiting."
                .to_string()
        } else {
            "Wait a few minutes and retry, or export browser cookies to a \
             Netscape-format file and point YOUTUBE_COOKIES at it to authenticate."
                .to_string()
        }
    }
}

impl Default for SubtitleFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// 字幕轨的 baseUrl 默认返回 XML，加 fmt=vtt 拿 WebVTT
fn vtt_url(base_url: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}fmt=vtt", base_url, separator)
}
