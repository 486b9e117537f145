//! HTTP method as a typed enum.
//!
//! Covers the verbs a route can be declared for: the RFC 9110 methods plus
//! `PRI`, the HTTP/2 connection preface verb.
//!
//! Unknown method strings are rejected at the server level with `405 Method Not Allowed`
//! before they ever reach the dispatcher.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::UnknownMethod;

/// A routable HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Trace,
    Connect,
    Pri,
}

impl Method {
    /// Every routable method, in the order advertised by
    /// `Access-Control-Allow-Methods`.
    pub const ALL: [Method; 10] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Patch,
        Self::Options,
        Self::Head,
        Self::Trace,
        Self::Connect,
        Self::Pri,
    ];

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get     => "GET",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Delete  => "DELETE",
            Self::Patch   => "PATCH",
            Self::Options => "OPTIONS",
            Self::Head    => "HEAD",
            Self::Trace   => "TRACE",
            Self::Connect => "CONNECT",
            Self::Pri     => "PRI",
        }
    }
}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_owned()))
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = UnknownMethod;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_wire_name() {
        for m in Method::ALL {
            assert_eq!(m.as_str().parse::<Method>().unwrap(), m);
        }
    }

    #[test]
    fn parsing_is_case_sensitive() {
        assert!("get".parse::<Method>().is_err());
        assert!("PROPFIND".parse::<Method>().is_err());
    }

    #[test]
    fn converts_from_http_method() {
        assert_eq!(Method::try_from(&http::Method::PATCH).unwrap(), Method::Patch);
        let pri = http::Method::from_bytes(b"PRI").unwrap();
        assert_eq!(Method::try_from(&pri).unwrap(), Method::Pri);
    }

    #[test]
    fn deserializes_from_json_string() {
        let m: Vec<Method> = serde_json::from_str(r#"["GET","DELETE"]"#).unwrap();
        assert_eq!(m, vec![Method::Get, Method::Delete]);
        assert!(serde_json::from_str::<Method>(r#""BREW""#).is_err());
    }
}
