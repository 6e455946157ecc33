//! Optional results
//!
//! Since failures of asynchronous operations are never rethrown through the
//! primary accessors of this crate, readers get an optional result instead: a
//! value paired with a validity flag. An invalid response carries no value,
//! and the failure which caused it has already been handed to the error sink.


/// A possibly absent result of an asynchronous operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Response<T> {
    value: Option<T>,
}
//
impl<T> Response<T> {
    /// Build a valid response holding some value
    pub fn valid(value: T) -> Self {
        Response { value: Some(value) }
    }

    /// Build an invalid response
    pub fn invalid() -> Self {
        Response { value: None }
    }

    /// Truth that this response holds a value
    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    /// Access the value, if any
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Extract the value, if any
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// Extract the value, or fall back to a default for invalid responses
    pub fn unwrap_or(self, default: T) -> T {
        self.value.unwrap_or(default)
    }

    /// Transform the value of a valid response
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Response<U> {
        Response { value: self.value.map(f) }
    }
}
//
impl<T> Default for Response<T> {
    fn default() -> Self {
        Response::invalid()
    }
}
//
impl<T> From<Option<T>> for Response<T> {
    fn from(value: Option<T>) -> Self {
        Response { value }
    }
}
//
impl<T> From<Response<T>> for Option<T> {
    fn from(response: Response<T>) -> Self {
        response.value
    }
}
