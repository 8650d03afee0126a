//! Text normalization helpers shared by the filter and the cache key.

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

/// Canonical comparison form of a location token or identifier cell.
///
/// Whitespace is collapsed and letters are uppercased, so `" united  states"`
/// and `"UNITED STATES"` compare equal.
pub fn normalize_token<T: AsRef<str>>(token: T) -> String {
    normalize_inline_whitespace(token).to_uppercase()
}

/// Normalize, drop empties, sort and dedupe a token list.
pub fn canonical_tokens<I, T>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut out: Vec<String> = tokens
        .into_iter()
        .map(normalize_token)
        .filter(|token| !token.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_inline_whitespace_collapses_runs() {
        let input = "Alpha\n\n  Beta\tGamma";
        assert_eq!(normalize_inline_whitespace(input), "Alpha Beta Gamma");
    }

    #[test]
    fn normalize_token_uppercases() {
        assert_eq!(normalize_token(" united  states "), "UNITED STATES");
        assert_eq!(normalize_token("it"), "IT");
        assert_eq!(normalize_token("840"), "840");
    }

    #[test]
    fn canonical_tokens_are_sorted_and_unique() {
        assert_eq!(
            canonical_tokens(["us", "IT", " ", "US"]),
            vec!["IT".to_string(), "US".to_string()]
        );
    }
}
