use serde_json::Value;

/// The decoded body of a successful response.
///
/// `Empty` is the zero-length body sentinel. It is not the same as `Json(Value::Null)`
/// nor `Json({})`: only schemas that accept the absence of a value accept it.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// The server returned a success status with no body.
    Empty,
    /// The server returned a JSON body.
    Json(Value),
}

impl Output {
    /// Returns true for the empty sentinel.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The JSON value, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Empty => None,
        }
    }
}
