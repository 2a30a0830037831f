//! パース関連のユーティリティ関数

use anyhow::Result;

/// "メソッド名:行" 形式のブレークポイント位置をパースする
///
/// # Examples
/// ```
/// use renge_core::parse::parse_location;
///
/// let (method, line) = parse_location("countdown:2").unwrap();
/// assert_eq!(method, "countdown");
/// assert_eq!(line, 2);
/// ```
pub fn parse_location(s: &str) -> Result<(String, u32)> {
    let s = s.trim();

    let (method, line) = s
        .rsplit_once(':')
        .ok_or_else(|| anyhow::anyhow!("Invalid location '{}' (expected method:line)", s))?;

    if method.is_empty() {
        return Err(anyhow::anyhow!("Invalid location '{}' (empty method name)", s));
    }

    let line: u32 = line
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid line number in '{}': {}", s, e))?;

    Ok((method.to_string(), line))
}
