//! Reply values produced by the dispatcher and written by the transport.

pub const CONTENT_TYPE_XML: &str = "application/xml";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_PAYLOAD_TOO_LARGE: u16 = 413;
pub const STATUS_SERVICE_UNAVAILABLE: u16 = 503;

/// Status, optional content type and body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl Reply {
    /// 200 with an XML document.
    #[must_use]
    pub fn xml(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: STATUS_OK,
            content_type: Some(CONTENT_TYPE_XML),
            body: body.into(),
        }
    }

    /// Plain-text reply with an explicit status.
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some(CONTENT_TYPE_TEXT),
            body: body.into().into_bytes(),
        }
    }

    /// 200 "Deleted".
    #[must_use]
    pub fn deleted() -> Self {
        Self::text(STATUS_OK, "Deleted")
    }

    /// 400 "Bad Request".
    #[must_use]
    pub fn bad_request() -> Self {
        Self::text(STATUS_BAD_REQUEST, "Bad Request")
    }

    /// 404 with no body.
    #[must_use]
    pub fn not_found() -> Self {
        Self::status_only(STATUS_NOT_FOUND)
    }

    /// 413 "Payload Too Large".
    #[must_use]
    pub fn payload_too_large() -> Self {
        Self::text(STATUS_PAYLOAD_TOO_LARGE, "Payload Too Large")
    }

    /// 503 "Service Unavailable".
    #[must_use]
    pub fn service_unavailable() -> Self {
        Self::text(STATUS_SERVICE_UNAVAILABLE, "Service Unavailable")
    }

    #[must_use]
    pub fn status_only(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossily decoded.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
