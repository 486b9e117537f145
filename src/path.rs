//! Path templates and the parameters extracted from them.
//!
//! A template is a path with `{name}` placeholders: `/users/{id}/posts/{post}`.
//! Each placeholder matches one run of `[a-zA-Z0-9_]+`, so a value can never
//! be empty and never span a `/`. Everything else in the template is literal
//! and matched case-sensitively. The whole path must match, not a prefix.

use std::sync::Arc;

use regex::Regex;

use crate::error::RegistrationError;

/// Character class a parameter value is matched against.
const PARAM_VALUE: &str = "([a-zA-Z0-9_]+)";

/// A compiled path template.
#[derive(Clone, Debug)]
pub struct PathMatcher {
    template: String,
    regex: Regex,
    names: Arc<[String]>,
}

impl PathMatcher {
    /// Compiles `template` into an anchored matcher.
    ///
    /// Fails on an unterminated `{`, a stray `}`, a placeholder whose name is
    /// not `[a-zA-Z0-9_]+`, or the same name used twice.
    pub fn compile(template: &str) -> Result<Self, RegistrationError> {
        let invalid = |reason: String| RegistrationError::InvalidTemplate {
            template: template.to_owned(),
            reason,
        };

        let mut pattern = String::from("^");
        let mut names: Vec<String> = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find(['{', '}']) {
            if rest[open..].starts_with('}') {
                return Err(invalid("unmatched `}`".into()));
            }
            pattern.push_str(&regex::escape(&rest[..open]));

            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| invalid("unterminated `{`".into()))?;
            let name = &after[..close];
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(invalid(format!("bad parameter name `{name}`")));
            }
            if names.iter().any(|n| n == name) {
                return Err(invalid(format!("parameter `{name}` declared twice")));
            }
            names.push(name.to_owned());
            pattern.push_str(PARAM_VALUE);
            rest = &after[close + 1..];
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| invalid(e.to_string()))?;
        Ok(Self { template: template.to_owned(), regex, names: names.into() })
    }

    /// Matches a concrete path, returning the parameter values in template order.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let values = caps
            .iter()
            .skip(1)
            .map(|m| m.map_or_else(String::new, |m| m.as_str().to_owned()))
            .collect();
        Some(Params { names: Arc::clone(&self.names), values })
    }

    pub fn template(&self) -> &str { &self.template }

    /// Placeholder names in declaration order.
    pub fn param_names(&self) -> &[String] { &self.names }
}

/// Parameter values extracted from a matched path, in template order.
///
/// Handlers receive them positionally; [`by_name`](Self::by_name) is a
/// convenience lookup over the same values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    names: Arc<[String]>,
    values: Vec<String>,
}

impl Params {
    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// The `index`-th value, counting placeholders left to right.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn by_name(&self, name: &str) -> Option<&str> {
        let index = self.names.iter().position(|n| n == name)?;
        self.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] { &self.values }
}
