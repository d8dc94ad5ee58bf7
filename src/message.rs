//! Log message values and their normalization to a single string.
//!
//! Callers hand the logger text, numbers, booleans, absent values, JSON-like
//! collections or arbitrary debuggable objects. Normalization never fails:
//! anything that is not already text falls back to a pretty-printed dump.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Text rendered for a null/absent message.
pub const NULL_TEXT: &str = "NULL";

/// Name of the field pulled out of key-value messages.
pub const MESSAGE_FIELD: &str = "message";

#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Already textual; logged unchanged.
    Text(String),
    /// Primitive or collection value.
    Value(Value),
    /// Pre-rendered pretty dump of an object.
    Dump(String),
}

impl Message {
    /// Serialize any value into its structured form. Values serde cannot
    /// represent are logged as a note instead of failing the call.
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => Message::Value(v),
            Err(e) => Message::Text(format!("<unserializable: {e}>")),
        }
    }

    /// Pretty `Debug` dump of an object.
    pub fn dump<T: fmt::Debug + ?Sized>(value: &T) -> Self {
        Message::Dump(format!("{value:#?}"))
    }

    /// Absent value, rendered as [`NULL_TEXT`].
    #[must_use]
    pub fn null() -> Self {
        Message::Value(Value::Null)
    }

    /// Produce the deterministic string form written to the log line.
    #[must_use]
    pub fn normalize(&self) -> String {
        match self {
            Message::Text(s) | Message::Dump(s) => s.clone(),
            Message::Value(v) => normalize_value(v),
        }
    }
}

fn normalize_value(v: &Value) -> String {
    match v {
        Value::Object(map) => match map.get(MESSAGE_FIELD) {
            // a null field counts as missing
            Some(Value::Null) | None => pretty(v),
            Some(inner) if is_primitive(inner) => scalar_text(inner),
            Some(inner) => pretty(inner),
        },
        Value::Array(_) => pretty(v),
        other => scalar_text(other),
    }
}

fn is_primitive(v: &Value) -> bool {
    matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::Null => NULL_TEXT.to_string(),
        other => pretty(other),
    }
}

fn pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalize())
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Text(s.to_string())
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Text(s)
    }
}

impl From<&String> for Message {
    fn from(s: &String) -> Self {
        Message::Text(s.clone())
    }
}

impl From<bool> for Message {
    fn from(b: bool) -> Self {
        Message::Value(Value::Bool(b))
    }
}

impl From<Value> for Message {
    fn from(v: Value) -> Self {
        Message::Value(v)
    }
}

impl From<&Value> for Message {
    fn from(v: &Value) -> Self {
        Message::Value(v.clone())
    }
}

impl From<f64> for Message {
    fn from(n: f64) -> Self {
        match serde_json::Number::from_f64(n) {
            Some(num) => Message::Value(Value::Number(num)),
            None => Message::Text(n.to_string()),
        }
    }
}

macro_rules! message_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Message {
            fn from(n: $t) -> Self {
                Message::Value(Value::from(n))
            }
        })*
    };
}

message_from_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<T: Into<Message>> From<Option<T>> for Message {
    fn from(v: Option<T>) -> Self {
        v.map_or_else(Message::null, Into::into)
    }
}
