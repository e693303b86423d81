use std::collections::{HashMap, HashSet};
use regex::{Captures, Regex};
use lazy_static::lazy_static;

lazy_static! {
    /// Matches `{name}` where `name` is an identifier. Group 1 is the name.
    pub(crate) static ref PLACEHOLDER_MATCH_RE: Regex = Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
}

#[inline]
fn strip_format(key: &str) -> &str {
    //! Strips "{" and "}" from a matched placeholder like "{a}".
    &key[1..key.len() - 1]
}

/// Replaces all placeholders with their filling values in a single pass.
///
/// Placeholders that are missing from `mapping` or still `None` are left as they are. Filling values are never
/// re-scanned, so a value that itself looks like `{name}` ends up literally in the output.
pub(crate) fn replace_all_placeholders(original: &str, mapping: &HashMap<String, Option<String>>) -> String {
    let new_string = PLACEHOLDER_MATCH_RE.replace_all(original, |captures: &Captures| {
        match mapping.get(&captures[1]) {
            Some(Some(value)) => value.clone(),
            _ => captures[0].to_string(),
        }
    });
    new_string.into_owned()
}

pub fn get_placeholders(string: &str) -> HashSet<String> {
    PLACEHOLDER_MATCH_RE.captures_iter(string)
        .map(|captures| captures[1].to_string())
        .collect()
}

/// Returns the name of the first placeholder wrapped in a second pair of braces, like `{{name}}`.
pub(crate) fn find_nested_placeholder(string: &str) -> Option<String> {
    let bytes = string.as_bytes();
    PLACEHOLDER_MATCH_RE.find_iter(string)
        .find(|whole| {
            let opened = whole.start() > 0 && bytes[whole.start() - 1] == b'{';
            let closed = bytes.get(whole.end()) == Some(&b'}');
            opened && closed
        })
        .map(|whole| strip_format(whole.as_str()).to_string())
}

#[cfg(test)]
mod string_tests {
    use std::collections::{HashMap, HashSet};
    use super::{find_nested_placeholder, get_placeholders, replace_all_placeholders};

    #[test]
    fn test_get_keys() {
        let string = "{a}";
        let keys = get_placeholders(string);
        let expect_keys = HashSet::from(["a".to_string()]);
        assert_eq!(expect_keys, keys);

        let string = "{a\n}";
        let keys = get_placeholders(string);
        assert_eq!(0, keys.len());

        let string = "{a}    {b_2}";
        let keys = get_placeholders(string);
        let expect_keys = HashSet::from(["a".to_string(), "b_2".to_string()]);
        assert_eq!(expect_keys, keys);
    }

    #[test]
    fn test_non_identifiers_are_literal() {
        assert!(get_placeholders("{ }").is_empty());
        assert!(get_placeholders("{\"a\": 1}").is_empty());
        assert!(get_placeholders("{2nd}").is_empty());
        assert!(get_placeholders("{source language}").is_empty());
    }

    #[test]
    fn test_replace() {
        let string = "{a} and {b} and {a}";
        let mapping = HashMap::from([
            ("a".to_string(), Some("alice".to_string())),
            ("b".to_string(), Some("bob".to_string())),
        ]);

        assert_eq!("alice and bob and alice", replace_all_placeholders(string, &mapping));
    }

    #[test]
    fn test_replace_does_not_rescan_values() {
        let mapping = HashMap::from([
            ("a".to_string(), Some("{b}".to_string())),
            ("b".to_string(), Some("bob".to_string())),
        ]);
        assert_eq!("{b} bob", replace_all_placeholders("{a} {b}", &mapping));
    }

    #[test]
    fn test_find_nested() {
        assert_eq!(Some("a".to_string()), find_nested_placeholder("x {{a}} y"));
        assert_eq!(None, find_nested_placeholder("{a} {b}"));
        assert_eq!(None, find_nested_placeholder("{{a} b}"));
        assert_eq!(None, find_nested_placeholder("{a}}"));
    }
}
