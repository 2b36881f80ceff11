//! The flat `key=value` parameter string spoken by the native engine.

use super::{ParamError, ParamMap};

/// Join a map into the engine's space-separated `key=value` string.
///
/// Keys come out sorted; the engine does not care about order.
pub fn join(map: &ParamMap) -> String {
    let mut out = String::new();
    for (key, value) in map {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out
}

/// Split an engine parameter string into a map.
///
/// Tokens are separated by whitespace and each must be exactly `key=value`
/// with a non-empty key. Values may be empty (`metric=`).
pub fn split(raw: &str) -> Result<ParamMap, ParamError> {
    let mut map = ParamMap::new();
    for token in raw.split_whitespace() {
        let pieces: Vec<&str> = token.split('=').collect();
        if pieces.len() != 2 {
            return Err(ParamError::Format(format!(
                "token {token:?} splits into {} pieces, expected key=value",
                pieces.len()
            )));
        }
        let (key, value) = (pieces[0], pieces[1]);
        if key.is_empty() {
            return Err(ParamError::Format(format!("token {token:?} has an empty key")));
        }
        if map.insert(key.to_string(), value.to_string()).is_some() {
            return Err(ParamError::Format(format!("duplicate key {key:?}")));
        }
    }
    Ok(map)
}

/// Parse engine config-file text: one `key = value` per line.
///
/// `#` starts a comment; blank lines are skipped. Spaces around `=` are
/// allowed here, unlike the flat string.
pub fn parse_config_text(text: &str) -> Result<ParamMap, ParamError> {
    let mut map = ParamMap::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = match line.split_once('#') {
            Some((content, _)) => content,
            None => line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(ParamError::Format(format!(
                "line {}: expected key = value, got {line:?}",
                lineno + 1
            )));
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(ParamError::Format(format!("line {}: bad key {key:?}", lineno + 1)));
        }
        if value.contains(char::is_whitespace) || value.contains('=') {
            return Err(ParamError::Format(format!(
                "line {}: value {value:?} for {key} cannot hold whitespace or '='",
                lineno + 1
            )));
        }
        if map.insert(key.to_string(), value.to_string()).is_some() {
            return Err(ParamError::Format(format!(
                "line {}: duplicate key {key:?}",
                lineno + 1
            )));
        }
    }
    Ok(map)
}

// =============================================================================
// Tests
// =============================================================================
