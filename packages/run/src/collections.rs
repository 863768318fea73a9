//! Named collections passed between the runtime and the application.

use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use cycle_stream::Stream;

use crate::driver::{Driver, ErasedDriver};
use crate::error::{Result, RunError};

/// The drivers an application runs with, by name.
///
/// This is the whole configuration of a runtime; there is no global driver
/// registry.
///
/// ```rust
/// use cycle_run::{driver_fn, Drivers, RunError};
/// use cycle_stream::Stream;
///
/// let drivers = Drivers::new()
///     .with("log", driver_fn(|r: Stream<String>| -> Result<Stream<()>, RunError> {
///         Ok(r.map(|_| ()))
///     }));
/// assert_eq!(drivers.names().collect::<Vec<_>>(), vec!["log"]);
/// ```
#[derive(Clone, Default)]
pub struct Drivers {
    drivers: BTreeMap<String, Rc<dyn ErasedDriver>>,
}

impl Drivers {
    /// An empty driver set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a driver under `name`, replacing any driver already there.
    pub fn with(mut self, name: impl Into<String>, driver: impl Driver) -> Self {
        self.insert(name, driver);
        self
    }

    /// Add a driver under `name`, replacing any driver already there.
    pub fn insert(&mut self, name: impl Into<String>, driver: impl Driver) {
        self.drivers.insert(name.into(), Rc::new(driver));
    }

    /// Driver names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(|s| s.as_str())
    }

    /// Number of drivers.
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Check if there are no drivers.
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &Rc<dyn ErasedDriver>)> {
        self.drivers.iter()
    }
}

impl fmt::Debug for Drivers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.drivers.keys()).finish()
    }
}

/// Driver responses, by driver name.
#[derive(Clone, Default)]
pub struct Responses {
    responses: BTreeMap<String, Rc<dyn Any>>,
}

impl Responses {
    pub(crate) fn insert(&mut self, name: String, response: Rc<dyn Any>) {
        self.responses.insert(name, response);
    }

    /// Get the response of driver `name` as an `R`.
    ///
    /// # Errors
    ///
    /// `UnknownDriver` if there is no such driver, `ResponseType` if its
    /// response is not an `R`.
    pub fn get<R: Clone + 'static>(&self, name: &str) -> Result<R> {
        let response = self
            .responses
            .get(name)
            .ok_or_else(|| RunError::UnknownDriver(name.to_string()))?;
        response
            .downcast_ref::<R>()
            .cloned()
            .ok_or_else(|| RunError::ResponseType {
                driver: name.to_string(),
                expected: type_name::<R>(),
            })
    }

    /// Check whether driver `name` has a response.
    pub fn contains(&self, name: &str) -> bool {
        self.responses.contains_key(name)
    }

    /// Driver names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.responses.keys().map(|s| s.as_str())
    }
}

impl fmt::Debug for Responses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.responses.keys()).finish()
    }
}

/// Request streams returned by the application, by driver name.
///
/// ```rust
/// use cycle_run::Requests;
/// use cycle_stream::Stream;
///
/// let requests = Requests::new().with("log", Stream::of(["hello".to_string()]));
/// assert!(requests.get::<String>("log").is_ok());
/// assert!(requests.get::<i32>("log").is_err());
/// ```
#[derive(Clone, Default)]
pub struct Requests {
    requests: BTreeMap<String, Rc<dyn Any>>,
}

impl Requests {
    /// No requests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the request stream for driver `name`.
    pub fn with<T: Clone + 'static>(mut self, name: impl Into<String>, requests: Stream<T>) -> Self {
        self.insert(name, requests);
        self
    }

    /// Add the request stream for driver `name`.
    pub fn insert<T: Clone + 'static>(&mut self, name: impl Into<String>, requests: Stream<T>) {
        self.requests.insert(name.into(), Rc::new(requests));
    }

    /// Get the request stream for driver `name`.
    ///
    /// # Errors
    ///
    /// `MissingRequests` if there is none, `RequestType` if it does not carry
    /// `T`s.
    pub fn get<T: Clone + 'static>(&self, name: &str) -> Result<Stream<T>> {
        let requests = self.requests.get(name).ok_or_else(|| RunError::MissingRequests {
            driver: name.to_string(),
        })?;
        requests
            .downcast_ref::<Stream<T>>()
            .cloned()
            .ok_or_else(|| RunError::RequestType {
                driver: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Driver names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.requests.keys().map(|s| s.as_str())
    }

    /// Number of request streams.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Check if there are no request streams.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub(crate) fn raw(&self, name: &str) -> Option<&Rc<dyn Any>> {
        self.requests.get(name)
    }
}

impl fmt::Debug for Requests {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.requests.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver_fn;

    #[test]
    fn responses_typed_access() {
        let mut responses = Responses::default();
        responses.insert("n".into(), Rc::new(Stream::of([1])));

        assert!(responses.get::<Stream<i32>>("n").is_ok());
        assert!(matches!(
            responses.get::<Stream<String>>("n"),
            Err(RunError::ResponseType { .. })
        ));
        assert!(matches!(
            responses.get::<Stream<i32>>("missing"),
            Err(RunError::UnknownDriver(name)) if name == "missing"
        ));
    }

    #[test]
    fn requests_missing() {
        let requests = Requests::new();
        assert!(requests.is_empty());
        assert!(matches!(
            requests.get::<i32>("DOM"),
            Err(RunError::MissingRequests { driver }) if driver == "DOM"
        ));
    }

    #[test]
    fn drivers_replace_by_name() {
        let echo = || driver_fn(|r: Stream<i32>| -> Result<Stream<i32>> { Ok(r) });
        let drivers = Drivers::new().with("a", echo()).with("b", echo()).with("a", echo());
        assert_eq!(drivers.len(), 2);
        assert_eq!(format!("{:?}", drivers), r#"["a", "b"]"#);
    }
}
