//! `{name}` placeholder expansion for URL templates.
//!
//! Placeholders may carry whitespace inside the braces (`{ host }`).
//! Placeholders without a known, non-empty value are left untouched:
//!
//! ```
//! use std::collections::HashMap;
//! use courier::support::expand;
//!
//! let mut args = HashMap::new();
//! args.insert("base".to_string(), "http://127.0.0.1:8000".to_string());
//! assert_eq!(
//!     expand("{base }/users/{id}", &args),
//!     "http://127.0.0.1:8000/users/{id}"
//! );
//! ```

use std::collections::HashMap;

use crate::support::stack::ByteStack;

const OPEN: char = '{';
const CLOSE: char = '}';

/// Expand every placeholder of `template` found in `args`.
pub fn expand(template: &str, args: &HashMap<String, String>) -> String {
    let mut collecting = false;
    let mut stack = ByteStack::new();
    let mut resolved: HashMap<String, String> = HashMap::new();
    let mut utf8 = [0u8; 4];

    for c in template.chars() {
        if c == OPEN {
            collecting = true;
        }
        if collecting {
            stack.push(c.encode_utf8(&mut utf8));
        }
        if c == CLOSE {
            collecting = false;
            let Ok(token) = stack.pop() else {
                continue;
            };
            let value = lookup(args, &token).unwrap_or_default();
            resolved.insert(token, value);
        }
    }

    let mut expanded = template.to_string();
    for (token, value) in resolved {
        if !value.is_empty() {
            expanded = expanded.replace(&token, &value);
        }
    }
    expanded
}

fn lookup(args: &HashMap<String, String>, token: &str) -> Option<String> {
    args.iter()
        .find(|(name, _)| names_placeholder(token, name))
        .map(|(_, value)| value.clone())
}

/// Whether `token` contains `{<ws>*name<ws>*}`.
fn names_placeholder(token: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    token.match_indices(OPEN).any(|(at, _)| {
        let rest = token[at + OPEN.len_utf8()..].trim_start();
        rest.strip_prefix(name)
            .map(|tail| tail.trim_start().starts_with(CLOSE))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_known_placeholder_with_whitespace() {
        let args = args(&[("url", "http://www.example.com")]);
        assert_eq!(expand("{url }/aa/bb", &args), "http://www.example.com/aa/bb");
        assert_eq!(expand("{ url}/aa", &args), "http://www.example.com/aa");
    }

    #[test]
    fn leaves_unknown_placeholder() {
        let args = args(&[("url", "http://www.example.org")]);
        assert_eq!(
            expand("{url }/11/{test}", &args),
            "http://www.example.org/11/{test}"
        );
    }

    #[test]
    fn empty_value_is_not_substituted() {
        let args = args(&[("id", "")]);
        assert_eq!(expand("/users/{id}", &args), "/users/{id}");
    }

    #[test]
    fn repeated_placeholder_replaced_everywhere() {
        let args = args(&[("v", "2")]);
        assert_eq!(expand("/{v}/x/{v}", &args), "/2/x/2");
    }

    #[test]
    fn plain_text_and_stray_braces_untouched() {
        let args = args(&[("a", "1")]);
        assert_eq!(expand("no placeholders", &args), "no placeholders");
        assert_eq!(expand("odd } brace", &args), "odd } brace");
        assert_eq!(expand("open { never closed", &args), "open { never closed");
    }

    #[test]
    fn prefix_of_name_does_not_match() {
        assert!(!names_placeholder("{urls}", "url"));
        assert!(names_placeholder("{ url }", "url"));
    }
}
