#[must_use]
pub(crate) fn read_non_empty_env(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}

#[must_use]
pub(super) fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[must_use]
pub(super) fn parse_u64(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|raw| raw.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_trims_and_drops_blank_values() {
        assert_eq!(non_empty(Some("  robot ".to_string())).as_deref(), Some("robot"));
        assert_eq!(non_empty(Some("   ".to_string())), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn parse_u64_ignores_garbage() {
        assert_eq!(parse_u64(Some(" 2500 ")), Some(2500));
        assert_eq!(parse_u64(Some("soon")), None);
    }
}
