use serde::Deserialize;

/// 单条字幕事件（起止时间 + 文本）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionEvent {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

/// 观看页内嵌的播放器响应，只反序列化字幕相关的部分
#[derive(Debug, Deserialize)]
pub struct PlayerResponse {
    #[serde(default)]
    pub captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
pub struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    pub tracklist: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
pub struct TracklistRenderer {
    #[serde(rename = "captionTracks", default)]
    pub caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "languageCode")]
    pub language_code: String,
    /// 自动生成的字幕轨为 "asr"
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

impl PlayerResponse {
    /// 字幕轨列表，未开启字幕时为空
    pub fn caption_tracks(&self) -> &[CaptionTrack] {
        self.captions
            .as_ref()
            .and_then(|c| c.tracklist.as_ref())
            .map(|t| t.caption_tracks.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_tracklist() {
        let raw = r#"{
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [
                        {"baseUrl": "https://example.com/api/timedtext?v=abc&lang=en", "languageCode": "en"},
                        {"baseUrl": "https://example.com/api/timedtext?v=abc&lang=ko&kind=asr", "languageCode": "ko", "kind": "asr"}
                    ]
                }
            }
        }"#;

        let player: PlayerResponse = serde_json::from_str(raw).expect("应该能反序列化");
        let tracks = player.caption_tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language_code, "en");
        assert!(!tracks[0].is_auto_generated());
        assert!(tracks[1].is_auto_generated());
    }

    #[test]
    fn test_missing_captions_yields_empty_tracks() {
        let player: PlayerResponse = serde_json::from_str(r#"{"videoDetails": {}}"#).unwrap();
        assert!(player.caption_tracks().is_empty());
    }
}
