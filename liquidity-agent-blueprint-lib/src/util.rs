use serde_json::{Map, Value};

pub fn parse_json_object(value: &str, field_name: &str) -> Result<Option<Value>, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let parsed: Value = serde_json::from_str(trimmed)
        .map_err(|err| format!("{field_name} is not valid JSON: {err}"))?;

    if !parsed.is_object() {
        return Err(format!("{field_name} must be a JSON object"));
    }

    Ok(Some(parsed))
}

/// `true` / `1` (any case) enable a flag; anything else leaves it off.
pub fn parse_flag(value: Option<&str>) -> bool {
    value
        .map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
        .unwrap_or(false)
}

/// Truncate long process output before it goes into a log line.
pub fn log_excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim_end();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}… ({} bytes total)", &trimmed[..idx], trimmed.len()),
        None => trimmed.to_string(),
    }
}

/// Build an args map from `(name, value)` pairs.
pub fn args_map<I, K>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
