// ABOUTME: POSIX shell quoting for command strings sent to hosts.
// ABOUTME: Every path and user-supplied value passes through here.

/// Quote `value` as a single shell word.
///
/// Values made only of safe characters are left bare so logged commands stay
/// readable; anything else is wrapped in single quotes.
pub fn quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ':' | '@' | '=' | '+' | ','));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

/// Quote every value and join them with spaces.
pub fn quote_all<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| quote(v.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parent directory of a remote path, or `.` for a bare name.
pub fn parent(path: &str) -> &str {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => ".",
    }
}
