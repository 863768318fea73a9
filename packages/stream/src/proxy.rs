//! Two-phase proxies for circular wiring.

use std::cell::Cell;
use std::rc::Rc;

use tracing::trace;

use crate::error::BindError;
use crate::observer::Notification;
use crate::stream::Stream;
use crate::subject::Subject;
use crate::subscription::Subscription;

/// A stream that exists before its source does.
///
/// Subscribers attach to [`stream`](ProxyStream::stream) right away. Nothing
/// flows until [`bind`](ProxyStream::bind) connects a source; from then on
/// every source notification is forwarded. Values the source produced before
/// the bind are not replayed.
///
/// # Example
///
/// ```
/// use cycle_stream::{ProxyStream, Stream};
///
/// let proxy = ProxyStream::new();
/// let doubled = proxy.stream().map(|v: i32| v * 2);
///
/// let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
/// let s = seen.clone();
/// let _sub = doubled.subscribe_next(move |v| s.borrow_mut().push(v));
///
/// let _binding = proxy.bind(&Stream::of([1, 2])).unwrap();
/// assert_eq!(*seen.borrow(), vec![2, 4]);
/// ```
pub struct ProxyStream<T> {
    subject: Subject<T>,
    bound: Rc<Cell<bool>>,
}

impl<T> Clone for ProxyStream<T> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            bound: Rc::clone(&self.bound),
        }
    }
}

impl<T> std::fmt::Debug for ProxyStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyStream")
            .field("bound", &self.bound.get())
            .finish()
    }
}

impl<T: Clone + 'static> Default for ProxyStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> ProxyStream<T> {
    /// Create an unbound proxy.
    pub fn new() -> Self {
        Self {
            subject: Subject::new(),
            bound: Rc::new(Cell::new(false)),
        }
    }

    /// The subscribable side of the proxy.
    pub fn stream(&self) -> Stream<T> {
        self.subject.stream()
    }

    /// Check whether a source has been bound.
    pub fn is_bound(&self) -> bool {
        self.bound.get()
    }

    /// Connect the source.
    ///
    /// The returned subscription keeps the source flowing into the proxy;
    /// dropping it stops the forwarding. A proxy accepts one source for its
    /// whole life, even after that binding ends.
    pub fn bind(&self, source: &Stream<T>) -> Result<Subscription, BindError> {
        if self.bound.replace(true) {
            return Err(BindError::AlreadyBound);
        }
        trace!("binding proxy stream");

        let subject = self.subject.clone();
        Ok(source.subscribe(move |notification| match notification {
            Notification::Next(value) => subject.next(value),
            Notification::Error(e) => subject.error(e),
            Notification::Complete => subject.complete(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;
    use std::cell::RefCell;

    #[test]
    fn subscribe_before_bind() {
        let proxy = ProxyStream::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let _sub = proxy.stream().subscribe_next(move |v: i32| l.borrow_mut().push(v));

        assert!(!proxy.is_bound());
        let source = Subject::new();
        let _binding = proxy.bind(&source.stream()).unwrap();
        assert!(proxy.is_bound());

        source.next(7);
        assert_eq!(*log.borrow(), vec![7]);
    }

    #[test]
    fn no_replay_of_values_before_bind() {
        let proxy = ProxyStream::new();
        let source = Subject::new();
        source.next(1);

        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let _sub = proxy.stream().subscribe_next(move |v: i32| l.borrow_mut().push(v));
        let _binding = proxy.bind(&source.stream()).unwrap();
        source.next(2);
        assert_eq!(*log.borrow(), vec![2]);
    }

    #[test]
    fn second_bind_fails() {
        let proxy: ProxyStream<i32> = ProxyStream::new();
        let _first = proxy.bind(&Stream::never()).unwrap();
        assert_eq!(
            proxy.bind(&Stream::never()).unwrap_err(),
            BindError::AlreadyBound
        );
    }

    #[test]
    fn source_failure_reaches_subscribers() {
        let proxy: ProxyStream<i32> = ProxyStream::new();
        let result = Rc::new(RefCell::new(None));
        let r = Rc::clone(&result);
        let _sub = proxy.stream().subscribe(move |n| {
            if let Notification::Error(e) = n {
                *r.borrow_mut() = Some(e);
            }
        });
        let _binding = proxy.bind(&Stream::fail(StreamError::new("driver died"))).unwrap();
        assert_eq!(*result.borrow(), Some(StreamError::new("driver died")));
    }

    #[test]
    fn dropping_binding_stops_forwarding() {
        let proxy = ProxyStream::new();
        let source = Subject::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let _sub = proxy.stream().subscribe_next(move |v: i32| l.borrow_mut().push(v));

        let binding = proxy.bind(&source.stream()).unwrap();
        source.next(1);
        drop(binding);
        source.next(2);
        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(source.observer_count(), 0);
    }
}
