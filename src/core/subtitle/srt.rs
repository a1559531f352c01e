//! WebVTT 解析与 SRT 渲染

use crate::models::caption::CaptionEvent;

/// 把 WebVTT 文本解析成字幕事件序列。
/// 跳过文件头、NOTE/STYLE 块和 cue 标识行，忽略 cue 设置。
pub fn parse_vtt(input: &str) -> Vec<CaptionEvent> {
    let mut events = Vec::new();
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        let line = line.trim_start_matches('\u{feff}').trim();
        if line.is_empty()
            || line.starts_with("WEBVTT")
            || line.starts_with("NOTE")
            || line.starts_with("STYLE")
            || line.starts_with("REGION")
            || line.starts_with("Kind:")
            || line.starts_with("Language:")
        {
            continue;
        }

        let Some((start_ms, end_ms)) = parse_cue_timing(line) else {
            // cue 标识行或无法识别的行
            continue;
        };

        let mut text_lines = Vec::new();
        while let Some(next) = lines.peek() {
            let text = next.trim();
            if text.is_empty() || text.contains("-->") {
                break;
            }
            text_lines.push(text.to_string());
            lines.next();
        }
        if !text_lines.is_empty() {
            events.push(CaptionEvent {
                start_ms,
                end_ms,
                text: text_lines.join("\n"),
            });
        }
    }

    events
}

fn parse_cue_timing(line: &str) -> Option<(u64, u64)> {
    let (start_raw, rest) = line.split_once("-->")?;
    // 终点时间戳后面可以跟 cue 设置（align:start position:0% 之类）
    let end_raw = rest.split_whitespace().next()?;
    let start = parse_timestamp(start_raw.trim())?;
    let end = parse_timestamp(end_raw)?;
    Some((start, end))
}

/// `HH:MM:SS.mmm` 或 `MM:SS.mmm`（VTT 允许省略小时），分隔符兼容逗号
pub fn parse_timestamp(raw: &str) -> Option<u64> {
    let (clock, millis_raw) = raw.split_once('.').or_else(|| raw.split_once(','))?;
    let millis: u64 = millis_raw.parse().ok()?;
    if millis_raw.len() != 3 || millis > 999 {
        return None;
    }

    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds): (u64, u64, u64) = match parts.len() {
        2 => (0, parts[0].parse().ok()?, parts[1].parse().ok()?),
        3 => (
            parts[0].parse().ok()?,
            parts[1].parse().ok()?,
            parts[2].parse().ok()?,
        ),
        _ => return None,
    };
    if minutes > 59 || seconds > 59 {
        return None;
    }
    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

/// 渲染成 SRT：从 1 开始连续编号，`HH:MM:SS,mmm` 时间段，空行分隔
pub fn render_srt(events: &[CaptionEvent]) -> String {
    let mut out = String::new();
    for (index, event) in events.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_timestamp(event.start_ms),
            format_timestamp(event.end_ms),
            event.text
        ));
    }
    out
}

pub fn format_timestamp(ms: u64) -> String {
    format!(
        "{:02}:{:02}:{:02},{:03}",
        ms / 3_600_000,
        (ms % 3_600_000) / 60_000,
        (ms % 60_000) / 1000,
        ms % 1000
    )
}
