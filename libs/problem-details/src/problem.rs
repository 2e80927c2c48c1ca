//! RFC 7807 Problem Details entity and its wire representation

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, StatusCode, header};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ProblemError;

/// Content type for Problem Details documents.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

pub const FIELD_TYPE: &str = "type";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_DETAIL: &str = "detail";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_INSTANCE: &str = "instance";

/// Member names owned by the problem itself; never usable as extensions.
pub const RESERVED_MEMBERS: [&str; 5] = [
    FIELD_TYPE,
    FIELD_TITLE,
    FIELD_DETAIL,
    FIELD_STATUS,
    FIELD_INSTANCE,
];

/// Returns true if `name` is one of the reserved problem members.
#[must_use]
pub fn is_reserved_member(name: &str) -> bool {
    RESERVED_MEMBERS.contains(&name)
}

/// Custom deserializer for `StatusCode` from u16
fn deserialize_status_code<'de, D>(deserializer: D) -> Result<StatusCode, D::Error>
where
    D: Deserializer<'de>,
{
    let code = u16::deserialize(deserializer)?;
    StatusCode::from_u16(code).map_err(serde::de::Error::custom)
}

/// Borrowed view used to emit a problem once its extensions are validated.
#[derive(Serialize)]
struct WireProblemRef<'a> {
    #[serde(rename = "type")]
    type_url: &'a str,
    title: &'a str,
    detail: &'a str,
    status: u16,
    instance: &'a str,
    #[serde(flatten)]
    extensions: &'a Map<String, Value>,
}

/// Owned shape read back from the wire; unknown members become extensions.
#[derive(Deserialize)]
struct WireProblem {
    #[serde(rename = "type", default)]
    type_url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: String,
    #[serde(deserialize_with = "deserialize_status_code")]
    status: StatusCode,
    #[serde(default)]
    instance: String,
    #[serde(flatten)]
    extensions: Map<String, Value>,
}

/// A single error occurrence in RFC 7807 form.
#[derive(Debug, Clone)]
#[must_use]
pub struct Problem {
    /// A URI reference that identifies the problem type.
    /// Empty means nothing more specific than the HTTP status.
    pub type_url: String,
    /// A short, human-readable summary of the problem type.
    pub title: String,
    /// A human-readable explanation specific to this occurrence.
    pub detail: String,
    /// The HTTP status code for this occurrence. Serializes as u16.
    pub status: StatusCode,
    /// A URI reference that identifies this specific occurrence.
    pub instance: String,
    /// Correlation identifier taken from the request context.
    /// Not part of the wire document.
    pub trace: String,
    extensions: Map<String, Value>,
}

impl Problem {
    /// Create a new Problem with the given status, title, and detail.
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: String::new(),
            title: title.into(),
            detail: detail.into(),
            status,
            instance: String::new(),
            trace: String::new(),
            extensions: Map::new(),
        }
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = uri.into();
        self
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = trace.into();
        self
    }

    /// Insert or overwrite an extension member.
    ///
    /// # Errors
    /// Returns `ProblemError::ReservedField` if `key` is a reserved member name.
    /// Returns `ProblemError::Serialization` if `value` cannot be represented as JSON.
    pub fn set_extension<V>(&mut self, key: impl Into<String>, value: &V) -> Result<(), ProblemError>
    where
        V: Serialize + ?Sized,
    {
        let key = key.into();
        if is_reserved_member(&key) {
            return Err(ProblemError::ReservedField { field: key });
        }
        let value = serde_json::to_value(value).map_err(ProblemError::Serialization)?;
        self.extensions.insert(key, value);
        Ok(())
    }

    /// Builder form of [`Problem::set_extension`].
    ///
    /// # Errors
    /// Same as [`Problem::set_extension`].
    pub fn with_extension<V>(mut self, key: impl Into<String>, value: &V) -> Result<Self, ProblemError>
    where
        V: Serialize + ?Sized,
    {
        self.set_extension(key, value)?;
        Ok(self)
    }

    #[must_use]
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    #[must_use]
    pub fn extensions(&self) -> &Map<String, Value> {
        &self.extensions
    }

    /// Direct access to the extension members.
    ///
    /// Keys written here are not checked; reserved names are rejected when
    /// the problem is serialized.
    pub fn extensions_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extensions
    }

    /// Check every extension key before anything is written out.
    ///
    /// # Errors
    /// Returns `ProblemError::ReservedField` naming the first offending key.
    pub fn validate_extensions(&self) -> Result<(), ProblemError> {
        match self.extensions.keys().find(|k| is_reserved_member(k)) {
            Some(field) => Err(ProblemError::reserved(field)),
            None => Ok(()),
        }
    }

    fn wire(&self) -> WireProblemRef<'_> {
        WireProblemRef {
            type_url: &self.type_url,
            title: &self.title,
            detail: &self.detail,
            status: self.status.as_u16(),
            instance: &self.instance,
            extensions: &self.extensions,
        }
    }

    /// Encode the problem as a flat JSON object.
    ///
    /// # Errors
    /// Returns `ProblemError::ReservedField` if any extension key is reserved;
    /// no bytes are produced in that case.
    /// Returns `ProblemError::Serialization` if JSON encoding fails.
    pub fn to_json(&self) -> Result<Vec<u8>, ProblemError> {
        self.validate_extensions()?;
        serde_json::to_vec(&self.wire()).map_err(ProblemError::Serialization)
    }

    /// Decode a problem from a JSON document.
    ///
    /// # Errors
    /// Returns `ProblemError::Malformed` if the document is not a problem object.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ProblemError> {
        serde_json::from_slice(bytes).map_err(ProblemError::Malformed)
    }

    /// Build an `application/problem+json` response whose status line matches `status`.
    ///
    /// # Errors
    /// Propagates any error from [`Problem::to_json`] or response assembly.
    pub fn to_response(&self) -> Result<Response, ProblemError> {
        let body = self.to_json()?;
        problem_response(self.status, body)
    }
}

/// Equality over the wire members: type, title, detail, status, instance
/// and extensions. `trace` is excluded since it never leaves the process.
impl PartialEq for Problem {
    fn eq(&self, other: &Self) -> bool {
        self.type_url == other.type_url
            && self.title == other.title
            && self.detail == other.detail
            && self.status == other.status
            && self.instance == other.instance
            && self.extensions == other.extensions
    }
}

impl Serialize for Problem {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.validate_extensions()
            .map_err(serde::ser::Error::custom)?;
        self.wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Problem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = WireProblem::deserialize(deserializer)?;
        Ok(Self {
            type_url: wire.type_url,
            title: wire.title,
            detail: wire.detail,
            status: wire.status,
            instance: wire.instance,
            trace: String::new(),
            extensions: wire.extensions,
        })
    }
}

/// Axum integration: make Problem directly usable as a handler response.
///
/// A problem that cannot be serialized is logged and answered with a
/// bodiless 500.
impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        match self.to_response() {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    status = self.status.as_u16(),
                    "failed to serialize problem"
                );
                bare_problem_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

pub(crate) fn problem_response(status: StatusCode, body: Vec<u8>) -> Result<Response, ProblemError> {
    let resp = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, APPLICATION_PROBLEM_JSON)
        .body(Body::from(body))?;
    Ok(resp)
}

pub(crate) fn bare_problem_response(status: StatusCode) -> Response {
    let mut resp = Response::new(Body::empty());
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
    );
    resp
}
