//! Token-level helpers for the built-in casts.

use crate::constants::LIST_DELIMITER;

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

pub(crate) fn is_null_token(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "null" | "none" | "")
}

/// Split a delimited list value into trimmed elements.
///
/// Single or double quotes group text, so quoted elements may contain the
/// delimiter. Runs of delimiters produce no empty elements; an empty input
/// yields an empty list.
pub(crate) fn split_list(raw: &str) -> Result<Vec<String>, &'static str> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for ch in raw.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None => match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    in_token = true;
                }
                LIST_DELIMITER => {
                    if in_token {
                        items.push(current.trim().to_string());
                    }
                    current.clear();
                    in_token = false;
                }
                c if c.is_whitespace() => current.push(c),
                _ => {
                    current.push(ch);
                    in_token = true;
                }
            },
        }
    }

    if quote.is_some() {
        return Err("unterminated quote in list value");
    }
    if in_token {
        items.push(current.trim().to_string());
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_tokens() {
        for token in ["true", "TRUE", "1", "yes", "Yes", "on"] {
            assert_eq!(parse_bool(token), Some(true), "{token}");
        }
        for token in ["false", "False", "0", "no", "NO", "off", ""] {
            assert_eq!(parse_bool(token), Some(false), "{token}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_null_tokens() {
        assert!(is_null_token("null"));
        assert!(is_null_token("None"));
        assert!(is_null_token(""));
        assert!(!is_null_token("nil"));
    }

    #[test]
    fn test_split_list_trims_and_skips_empty_runs() {
        assert_eq!(split_list("a, b ,c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(split_list("a,,b").unwrap(), vec!["a", "b"]);
        assert_eq!(split_list("a, , b, ").unwrap(), vec!["a", "b"]);
        assert!(split_list("").unwrap().is_empty());
    }

    #[test]
    fn test_split_list_quotes_group_delimiters() {
        assert_eq!(
            split_list("\"x, y\", 'z'").unwrap(),
            vec!["x, y".to_string(), "z".to_string()]
        );
        assert!(split_list("\"open, ended").is_err());
    }
}
