//! Request target parsing: path segments and query parameters.
//!
//! A target such as `/entities/12/Placeable/visible?x=1` becomes the segment
//! list `["entities", "12", "Placeable", "visible"]` plus the query pairs.
//! The segment count ("depth") selects the kind of resource addressed.

use percent_encoding::percent_decode_str;

/// Path prefixes served by the scene dispatcher.
pub const SCENE_PREFIXES: [&str; 2] = ["/entities", "/scene"];

/// Whether a raw request target belongs to the scene dispatcher.
#[must_use]
pub fn is_scene_path(url: &str) -> bool {
    SCENE_PREFIXES.iter().any(|prefix| url.starts_with(prefix))
}

/// A parsed request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl ResourcePath {
    /// Parse a raw request target.
    ///
    /// One leading and one trailing `/` are stripped before splitting, so an
    /// empty path yields a single empty segment. Segments are
    /// percent-decoded; the query is decoded as form data (`+` is a space).
    #[must_use]
    pub fn parse(url: &str) -> Self {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };
        let path = path.strip_prefix('/').unwrap_or(path);
        let path = path.strip_suffix('/').unwrap_or(path);

        let segments = path
            .split('/')
            .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
            .collect();
        let query = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Self { segments, query }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segment at `index`, or `""` past the end.
    #[must_use]
    pub fn segment(&self, index: usize) -> &str {
        self.segments.get(index).map_or("", String::as_str)
    }

    /// Returns the number of segments; always at least 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Whether any query item is present.
    #[must_use]
    pub fn has_query(&self) -> bool {
        !self.query.is_empty()
    }

    /// Value of a query key; the last occurrence wins.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All query pairs in request order, duplicates included.
    #[must_use]
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }
}
