//! Netscape 格式 cookies 文件 → Cookie 请求头

use std::fs;
use std::io;
use std::path::Path;

/// 读出指定域名的 cookie，拼成一个 `Cookie` 头的值。
/// 格式不对的行直接跳过；没有匹配的 cookie 时返回 None。
pub fn cookie_header_from_file(path: &Path, domain: &str) -> io::Result<Option<String>> {
    let text = fs::read_to_string(path)?;
    let mut pairs = Vec::new();

    for line in text.lines() {
        // curl 会给 HttpOnly cookie 加这个前缀
        let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            continue;
        }
        let cookie_domain = fields[0].trim_start_matches('.');
        if cookie_domain == domain || cookie_domain.ends_with(&format!(".{}", domain)) {
            pairs.push(format!("{}={}", fields[5], fields[6]));
        }
    }

    if pairs.is_empty() {
        Ok(None)
    } else {
        Ok(Some(pairs.join("; ")))
    }
}
