use std::collections::BTreeMap;

use regex::Regex;
use tracing::error;
use urlencoding::{decode, encode};

/// The parameter a trailing `*` segment is captured as.
pub const WILDCARD_PARAM: &str = "pathMatch";

#[derive(Clone, Debug, PartialEq, Eq)]
enum PatternSegment {
    Fixed(String),
    Parameter { key: String, optional: bool },
    Wildcard,
}

/// A compiled route path.
///
/// Supported segments:
/// - fixed segments, which must match exactly,
/// - `:key`, which matches one segment and captures it as `key`,
/// - `:key?`, which does the same, but may be absent,
/// - `*`, which matches the rest of the path (including nothing) and captures it as
///   [`WILDCARD_PARAM`].
///
/// A trailing `/` in the matched path is ignored.
#[derive(Clone, Debug)]
pub(crate) struct Pattern {
    segments: Vec<PatternSegment>,
    keys: Vec<String>,
    regex: Regex,
}

impl Pattern {
    pub(crate) fn parse(path: &str) -> Result<Self, regex::Error> {
        let segments: Vec<_> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|segment| {
                if segment == "*" {
                    return PatternSegment::Wildcard;
                }

                match segment.strip_prefix(':') {
                    Some(key) => match key.strip_suffix('?') {
                        Some(key) if !key.is_empty() => PatternSegment::Parameter {
                            key: key.to_string(),
                            optional: true,
                        },
                        _ if !key.is_empty() => PatternSegment::Parameter {
                            key: key.to_string(),
                            optional: false,
                        },
                        _ => PatternSegment::Fixed(segment.to_string()),
                    },
                    None => PatternSegment::Fixed(segment.to_string()),
                }
            })
            .collect();

        let mut keys = Vec::new();
        let mut source = String::from("^");
        for segment in &segments {
            match segment {
                PatternSegment::Fixed(fixed) => {
                    source.push('/');
                    source.push_str(&regex::escape(fixed));
                }
                PatternSegment::Parameter { key, optional } => {
                    keys.push(key.clone());
                    source.push_str(match optional {
                        true => "(?:/([^/]+?))?",
                        false => "/([^/]+?)",
                    });
                }
                PatternSegment::Wildcard => {
                    keys.push(WILDCARD_PARAM.to_string());
                    source.push_str("(?:/(.*))?");
                }
            }
        }
        source.push_str("/?$");

        Ok(Self {
            segments,
            keys,
            regex: Regex::new(&source)?,
        })
    }

    /// Whether the pattern has any segment other than fixed ones.
    pub(crate) fn is_dynamic(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Match `path`, returning the captured parameters.
    pub(crate) fn captures(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let captures = self.regex.captures(path)?;

        Some(
            self.keys
                .iter()
                .enumerate()
                .filter_map(|(i, key)| {
                    let value = captures.get(i + 1)?.as_str();
                    Some((key.clone(), decode_param(value)))
                })
                .collect(),
        )
    }

    /// Build a path from `params`.
    ///
    /// Returns the key of the first required parameter that is missing.
    pub(crate) fn fill(&self, params: &BTreeMap<String, String>) -> Result<String, String> {
        let mut path = String::new();

        for segment in &self.segments {
            match segment {
                PatternSegment::Fixed(fixed) => {
                    path.push('/');
                    path.push_str(fixed);
                }
                PatternSegment::Parameter { key, optional } => match params.get(key) {
                    Some(value) => {
                        path.push('/');
                        path.push_str(&encode(value));
                    }
                    None if *optional => {}
                    None => return Err(key.clone()),
                },
                PatternSegment::Wildcard => {
                    // the rest of a path may span several segments, so it isn't encoded
                    if let Some(rest) = params.get(WILDCARD_PARAM).filter(|r| !r.is_empty()) {
                        path.push('/');
                        path.push_str(rest.trim_start_matches('/'));
                    }
                }
            }
        }

        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }
}

fn decode_param(value: &str) -> String {
    match decode(value) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            error!(r#"failed to decode parameter value "{value}": {e}"#);
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn fixed() {
        let pattern = Pattern::parse("/users/list").unwrap();
        assert!(!pattern.is_dynamic());
        assert_eq!(pattern.captures("/users/list"), Some(params(&[])));
        assert_eq!(pattern.captures("/users/list/"), Some(params(&[])));
        assert_eq!(pattern.captures("/users"), None);
        assert_eq!(pattern.captures("/Users/list"), None);
    }

    #[test]
    fn root() {
        let pattern = Pattern::parse("/").unwrap();
        assert!(pattern.captures("/").is_some());
        assert!(pattern.captures("/a").is_none());
        assert_eq!(pattern.fill(&params(&[])), Ok(String::from("/")));
    }

    #[test]
    fn parameter() {
        let pattern = Pattern::parse("/users/:id/posts/:post").unwrap();
        assert!(pattern.is_dynamic());
        assert_eq!(
            pattern.captures("/users/j%C3%BCrgen/posts/3"),
            Some(params(&[("id", "jürgen"), ("post", "3")]))
        );
        assert_eq!(pattern.captures("/users//posts/3"), None);
        assert_eq!(
            pattern.fill(&params(&[("id", "a b"), ("post", "3")])),
            Ok(String::from("/users/a%20b/posts/3"))
        );
        assert_eq!(
            pattern.fill(&params(&[("id", "1")])),
            Err(String::from("post"))
        );
    }

    #[test]
    fn optional_parameter() {
        let pattern = Pattern::parse("/archive/:year?").unwrap();
        assert_eq!(pattern.captures("/archive"), Some(params(&[])));
        assert_eq!(
            pattern.captures("/archive/2017"),
            Some(params(&[("year", "2017")]))
        );
        assert_eq!(pattern.fill(&params(&[])), Ok(String::from("/archive")));
    }

    #[test]
    fn wildcard() {
        let pattern = Pattern::parse("/files/*").unwrap();
        assert_eq!(
            pattern.captures("/files/a/b.txt"),
            Some(params(&[(WILDCARD_PARAM, "a/b.txt")]))
        );
        assert!(pattern.captures("/files").is_some());
        assert!(pattern.captures("/other").is_none());
        assert_eq!(
            pattern.fill(&params(&[(WILDCARD_PARAM, "a/b.txt")])),
            Ok(String::from("/files/a/b.txt"))
        );

        let catch_all = Pattern::parse("/*").unwrap();
        assert!(catch_all.captures("/anything/at/all").is_some());
    }

    #[test]
    fn special_characters_are_literal() {
        let pattern = Pattern::parse("/a.b/(c)").unwrap();
        assert!(pattern.captures("/a.b/(c)").is_some());
        assert!(pattern.captures("/axb/(c)").is_none());
    }
}
