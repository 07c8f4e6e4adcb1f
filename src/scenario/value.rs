//! Values held by the variable store.
//!
//! Scenario variables are plain JSON-shaped data. Results of chain calls are
//! kept as the typed values the client returned and are only converted to
//! their canonical JSON form when a template reaches into them.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// A typed result that can be flattened into its canonical JSON form.
pub trait TypedOutput: fmt::Debug + Send + Sync {
    /// Convert into a generic JSON value.
    fn canonical(&self) -> serde_json::Result<serde_json::Value>;
}

impl<T> TypedOutput for T
where
    T: Serialize + fmt::Debug + Send + Sync,
{
    fn canonical(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// A value in the variable store.
#[derive(Debug, Clone)]
pub enum Value {
    /// Generic data: string, number, boolean, list, record or null
    Data(serde_json::Value),

    /// An opaque typed result of a chain call
    Typed(Arc<dyn TypedOutput>),
}

impl Value {
    /// Wrap a typed result.
    pub fn typed<T>(value: T) -> Self
    where
        T: Serialize + fmt::Debug + Send + Sync + 'static,
    {
        Self::Typed(Arc::new(value))
    }

    /// The canonical JSON form of this value.
    ///
    /// Borrows for generic data; typed results are converted.
    pub fn canonical(&self) -> serde_json::Result<Cow<'_, serde_json::Value>> {
        match self {
            Self::Data(v) => Ok(Cow::Borrowed(v)),
            Self::Typed(t) => t.canonical().map(Cow::Owned),
        }
    }

    /// Consume the value, returning its canonical JSON form.
    pub fn into_json(self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::Data(v) => Ok(v),
            Self::Typed(t) => t.canonical(),
        }
    }

    /// Render the value as template text.
    ///
    /// Strings pass through, scalars use their natural form, lists and records
    /// render as compact JSON and null renders as the empty string.
    pub fn render(&self) -> serde_json::Result<String> {
        Ok(render_json(self.canonical()?.as_ref()))
    }
}

/// Render a JSON value as template text.
pub fn render_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        composite => composite.to_string(),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.canonical().map_err(serde::ser::Error::custom)?.serialize(serializer)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self::Data(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Data(serde_json::Value::String(value.to_string()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Data(serde_json::Value::String(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Data(value.into())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Data(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Data(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Data(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize)]
    struct Balance {
        denom: String,
        amount: u64,
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(Value::from("kira1abc").render().unwrap(), "kira1abc");
        assert_eq!(Value::from(42).render().unwrap(), "42");
        assert_eq!(Value::from(true).render().unwrap(), "true");
        assert_eq!(Value::from(json!(1.5)).render().unwrap(), "1.5");
        assert_eq!(Value::from(json!(null)).render().unwrap(), "");
    }

    #[test]
    fn test_render_composites_as_json() {
        let list = Value::from(json!(["a", 1]));
        assert_eq!(list.render().unwrap(), r#"["a",1]"#);

        let record = Value::from(json!({"denom": "ukex"}));
        assert_eq!(record.render().unwrap(), r#"{"denom":"ukex"}"#);
    }

    #[test]
    fn test_typed_value_canonicalizes() {
        let value = Value::typed(Balance { denom: "ukex".to_string(), amount: 100 });

        let canonical = value.canonical().unwrap();
        assert_eq!(canonical.as_ref(), &json!({"denom": "ukex", "amount": 100}));
        assert_eq!(value.render().unwrap(), r#"{"amount":100,"denom":"ukex"}"#);
    }

    #[test]
    fn test_serialize_uses_canonical_form() {
        let value = Value::typed(Balance { denom: "ukex".to_string(), amount: 7 });
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"amount":7,"denom":"ukex"}"#);
    }
}
