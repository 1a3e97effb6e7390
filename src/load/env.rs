//! Environment-variable settings source.

/// Collects `(path, value)` overlays from environment variables carrying
/// the given prefix. `PREFIX<sep>A<sep>B=v` maps to path `["a", "b"]`;
/// values coerce to the most specific scalar type.
pub(crate) fn entries(prefix: &str, separator: &str) -> Vec<(Vec<String>, toml::Value)> {
    let prefix_with_sep = format!("{prefix}{separator}");
    let mut entries = Vec::new();

    for (key, value) in std::env::vars() {
        let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
            continue;
        };
        if path_str.is_empty() {
            continue;
        }
        let path = path_str
            .split(separator)
            .map(str::to_lowercase)
            .collect::<Vec<_>>();
        entries.push((path, coerce_value(&value)));
    }

    entries
}

// bool, then integer, then float, then string
fn coerce_value(raw: &str) -> toml::Value {
    if raw.eq_ignore_ascii_case("true") {
        return toml::Value::Boolean(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return toml::Value::Boolean(false);
    }
    coerce_number(raw).unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

fn coerce_number(raw: &str) -> Option<toml::Value> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        return raw.parse().ok().map(toml::Value::Integer);
    }
    if raw.contains('.') {
        return raw.parse().ok().map(toml::Value::Float);
    }
    None
}
