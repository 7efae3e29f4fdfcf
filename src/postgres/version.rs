//! Parses the `server_version` and `integer_datetimes` `ParameterStatus`
//! values collected during startup.

/// `(major, minor, revision, trailing suffix)`, e.g. `(10, 4, 0, " (Ubuntu 10.4)")`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
    pub suffix: String,
}

/// Split at `.`, parse the leading run of digit-and-dot characters as
/// major/minor/revision (missing components default to 0), and keep the
/// trailing non-numeric suffix verbatim.
pub fn parse_server_version(raw: &str) -> ServerVersion {
    let numeric_len = raw
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map_or(raw.len(), |(idx, _)| idx);

    let (numeric, suffix) = raw.split_at(numeric_len);

    let mut parts = numeric.split('.');
    let major = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let revision = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);

    ServerVersion { major, minor, revision, suffix: suffix.to_owned() }
}

/// `true` iff `value` is exactly `"on"`, `"yes"`, or `"1"`.
pub fn parse_integer_datetimes(value: &str) -> bool {
    matches!(value, "on" | "yes" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_with_suffix() {
        let v = parse_server_version("10.4 (Ubuntu 10.4)");
        assert_eq!(v, ServerVersion { major: 10, minor: 4, revision: 0, suffix: " (Ubuntu 10.4)".into() });
    }

    #[test]
    fn parses_three_part_version_no_suffix() {
        let v = parse_server_version("9.6.1");
        assert_eq!(v, ServerVersion { major: 9, minor: 6, revision: 1, suffix: String::new() });
    }

    #[test]
    fn integer_datetimes_exact_match_only() {
        assert!(parse_integer_datetimes("on"));
        assert!(parse_integer_datetimes("yes"));
        assert!(parse_integer_datetimes("1"));
        assert!(!parse_integer_datetimes("true"));
        assert!(!parse_integer_datetimes("0"));
        assert!(!parse_integer_datetimes("off"));
    }
}
