//! Request-scoped key/value context consulted for trace identifiers.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ProblemError;

type ContextValue = Arc<dyn Any + Send + Sync>;

/// Opaque key/value lookup carried alongside a request.
///
/// Keys and values are supplied by the caller. The only key this crate
/// interprets is the trace key configured on the
/// [`ProblemFactory`](crate::ProblemFactory), whose value must be a string.
///
/// Cloning is cheap: values are reference counted.
#[derive(Clone, Default)]
pub struct RequestContext {
    values: HashMap<String, ContextValue>,
}

impl RequestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn insert<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.values.insert(key.into(), Arc::new(value));
    }

    /// Builder form of [`RequestContext::insert`].
    #[must_use]
    pub fn with_value<T>(mut self, key: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&(dyn Any + Send + Sync)> {
        self.values.get(key).map(|v| &**v)
    }

    /// Typed value stored under `key`, if present and of type `T`.
    #[must_use]
    pub fn get_as<T: Any>(&self, key: &str) -> Option<&T> {
        self.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// String value stored under `key`, accepting `String` and `&'static str`.
    ///
    /// # Errors
    /// Returns `ProblemError::TraceNotString` when a value exists under `key`
    /// but is not a string.
    pub fn get_str(&self, key: &str) -> Result<Option<&str>, ProblemError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        if let Some(s) = value.downcast_ref::<String>() {
            return Ok(Some(s.as_str()));
        }
        if let Some(s) = value.downcast_ref::<&'static str>() {
            return Ok(Some(*s));
        }
        Err(ProblemError::TraceNotString {
            key: key.to_owned(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("RequestContext")
            .field("keys", &keys)
            .finish()
    }
}
