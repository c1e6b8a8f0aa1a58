//! Transport-neutral request type handed from the listener to the dispatcher.

use std::fmt;

/// HTTP verb, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    /// Any verb the dispatcher has no handler for.
    Other(String),
}

impl Method {
    #[must_use]
    pub fn parse(method: &str) -> Self {
        let method = method.trim();
        if method.eq_ignore_ascii_case("GET") {
            Self::Get
        } else if method.eq_ignore_ascii_case("PUT") {
            Self::Put
        } else if method.eq_ignore_ascii_case("POST") {
            Self::Post
        } else if method.eq_ignore_ascii_case("DELETE") {
            Self::Delete
        } else {
            Self::Other(method.to_ascii_uppercase())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Other(method) => method,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully read request: verb, raw target (path plus query) and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Raw request target, e.g. `/entities/5/Placeable?visible=false`.
    pub url: String,
    pub body: Vec<u8>,
}

impl HttpRequest {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// The path part of the target, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.split_once('?').map_or(&self.url, |(path, _)| path)
    }

    /// Whether the request carries a non-blank body.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.iter().any(|b| !b.is_ascii_whitespace())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!(Method::parse("get"), Method::Get);
        assert_eq!(Method::parse("Put"), Method::Put);
        assert_eq!(Method::parse("POST"), Method::Post);
        assert_eq!(Method::parse("delete"), Method::Delete);
        assert_eq!(Method::parse("patch"), Method::Other("PATCH".into()));
    }

    #[test]
    fn test_path_strips_query() {
        let req = HttpRequest::new(Method::Get, "/entities?name=box");
        assert_eq!(req.path(), "/entities");
        assert_eq!(HttpRequest::new(Method::Get, "/scene").path(), "/scene");
    }

    #[test]
    fn test_blank_body_counts_as_absent() {
        let req = HttpRequest::new(Method::Post, "/entities").with_body("  \n");
        assert!(!req.has_body());
        assert!(req.with_body("<entity/>").has_body());
    }
}
