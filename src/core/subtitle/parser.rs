use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::core::subtitle::SubtitleError;
use crate::models::caption::{CaptionTrack, PlayerResponse};

/// 匹配到赋值表达式本体，跳过 script 里对同名变量的其他引用
static PLAYER_RESPONSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ytInitialPlayerResponse\s*=\s*\{").unwrap());

/// 从观看页 HTML 的 script 标签里抠出内嵌的播放器响应 JSON。
/// 风控拦截页没有这段数据，调用方把缺失当作可重试错误。
pub fn extract_player_response(html: &str) -> Result<PlayerResponse, SubtitleError> {
    let document = Html::parse_document(html);
    let script_selector =
        Selector::parse("script").map_err(|_| SubtitleError::PlayerResponseMissing)?;

    for element in document.select(&script_selector) {
        let script_content = element.inner_html();
        let Some(assignment) = PLAYER_RESPONSE_RE.find(&script_content) else {
            continue;
        };
        let object_start = assignment.end() - 1;
        let Some(raw) = balanced_json_object(&script_content[object_start..]) else {
            continue;
        };

        let cleaned = sanitize_json(raw);
        match serde_json::from_str(&cleaned) {
            Ok(value) => return Ok(value),
            // 页面偶尔内嵌不严格的 JSON，用 json5 再试一次
            Err(_) => {
                if let Ok(value) = json5::from_str(&cleaned) {
                    return Ok(value);
                }
            }
        }
    }

    Err(SubtitleError::PlayerResponseMissing)
}

/// 选择字幕轨：
/// - `auto` 优先自动生成轨；
/// - 其余语言代码先找手工轨，再找同语言的自动轨；
/// - 都没有时退回 en，最后退回第一条。
pub fn select_track<'a>(tracks: &'a [CaptionTrack], lang: &str) -> Option<&'a CaptionTrack> {
    if tracks.is_empty() {
        return None;
    }
    if lang == "auto" {
        return tracks
            .iter()
            .find(|t| t.is_auto_generated())
            .or_else(|| tracks.first());
    }

    tracks
        .iter()
        .find(|t| !t.is_auto_generated() && t.language_code == lang)
        .or_else(|| tracks.iter().find(|t| t.language_code == lang))
        .or_else(|| tracks.iter().find(|t| t.language_code == "en"))
        .or_else(|| tracks.first())
}

/// 截取从 `{` 开始的一段配平 JSON 对象（跳过字符串字面量里的花括号）
fn balanced_json_object(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn sanitize_json(raw: &str) -> String {
    raw.replace("undefined", "null")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch_page(player_response: &str) -> String {
        format!(
            "<html><head><script>var x = 1;</script></head><body>\
             <script>var ytInitialPlayerResponse = {};var meta = {{\"a\":1}};</script>\
             </body></html>",
            player_response
        )
    }

    const TRACKS_JSON: &str = r#"{
        "captions": {
            "playerCaptionsTracklistRenderer": {
                "captionTracks": [
                    {"baseUrl": "https://example.com/tt?lang=en", "languageCode": "en"},
                    {"baseUrl": "https://example.com/tt?lang=ko", "languageCode": "ko"},
                    {"baseUrl": "https://example.com/tt?lang=en&kind=asr", "languageCode": "en", "kind": "asr"}
                ]
            }
        }
    }"#;

    #[test]
    fn test_extract_player_response_from_script() {
        let html = watch_page(TRACKS_JSON);
        let player = extract_player_response(&html).expect("应该能提取播放器响应");
        assert_eq!(player.caption_tracks().len(), 3);
    }

    #[test]
    fn test_extract_handles_nested_braces_in_strings() {
        let html = watch_page(r#"{"captions": null, "note": "braces } { inside \" string"}"#);
        let player = extract_player_response(&html).expect("字符串里的花括号不应干扰配平");
        assert!(player.caption_tracks().is_empty());
    }

    #[test]
    fn test_extract_sanitizes_undefined() {
        let html = watch_page(r#"{"captions": undefined}"#);
        let player = extract_player_response(&html).expect("undefined 应被当作 null");
        assert!(player.caption_tracks().is_empty());
    }

    #[test]
    fn test_missing_player_response() {
        let err = extract_player_response("<html><body>Sign in to confirm</body></html>")
            .unwrap_err();
        assert!(matches!(err, SubtitleError::PlayerResponseMissing));
    }

    fn sample_tracks() -> Vec<CaptionTrack> {
        let player: PlayerResponse = serde_json::from_str(TRACKS_JSON).unwrap();
        player.caption_tracks().to_vec()
    }

    #[test]
    fn test_select_manual_track_for_language() {
        let tracks = sample_tracks();
        let track = select_track(&tracks, "ko").unwrap();
        assert_eq!(track.language_code, "ko");
        assert!(!track.is_auto_generated());
    }

    #[test]
    fn test_select_prefers_manual_over_asr() {
        let tracks = sample_tracks();
        let track = select_track(&tracks, "en").unwrap();
        assert!(!track.is_auto_generated());
    }

    #[test]
    fn test_select_auto_prefers_asr_track() {
        let tracks = sample_tracks();
        let track = select_track(&tracks, "auto").unwrap();
        assert!(track.is_auto_generated());
    }

    #[test]
    fn test_select_falls_back_to_english_then_first() {
        let tracks = sample_tracks();
        let track = select_track(&tracks, "fr").unwrap();
        assert_eq!(track.language_code, "en");

        let only_ko = vec![tracks[1].clone()];
        let track = select_track(&only_ko, "fr").unwrap();
        assert_eq!(track.language_code, "ko");

        assert!(select_track(&[], "en").is_none());
    }

    #[test]
    fn test_balanced_json_object() {
        assert_eq!(balanced_json_object(r#"{"a":{"b":1}}tail"#), Some(r#"{"a":{"b":1}}"#));
        assert_eq!(balanced_json_object("not json"), None);
        assert_eq!(balanced_json_object("{unterminated"), None);
    }
}
