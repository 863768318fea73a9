//! The `Stream` type and its single-source operators.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::StreamError;
use crate::observer::{Notification, Observer};
use crate::subscription::Subscription;

type Producer<T> = dyn Fn(Observer<T>) -> Subscription;

/// A push-based sequence of values.
///
/// A `Stream` is a recipe: every call to [`subscribe`](Stream::subscribe)
/// runs the producer for that subscriber. Operators build new recipes on top
/// of old ones, so each subscription to a derived stream owns its own operator
/// state (a `scan` accumulator, for example). Multicasting comes from
/// [`Subject`](crate::Subject), whose streams are hot.
///
/// Streams are cheap to clone; clones share the producer.
pub struct Stream<T> {
    producer: Rc<Producer<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            producer: Rc::clone(&self.producer),
        }
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Create a stream from a producer.
    ///
    /// The producer is called once per subscriber with that subscriber's
    /// [`Observer`]. It may push synchronously and returns the teardown for
    /// the resources it acquired.
    pub fn create(producer: impl Fn(Observer<T>) -> Subscription + 'static) -> Self {
        Self {
            producer: Rc::new(producer),
        }
    }

    /// A stream that pushes `values` synchronously, then completes.
    pub fn of(values: impl IntoIterator<Item = T>) -> Self {
        let values: Rc<[T]> = values.into_iter().collect();
        Self::create(move |observer| {
            for value in values.iter() {
                if observer.is_closed() {
                    break;
                }
                observer.next(value.clone());
            }
            observer.complete();
            Subscription::empty()
        })
    }

    /// A stream that completes immediately.
    pub fn empty() -> Self {
        Self::create(|observer| {
            observer.complete();
            Subscription::empty()
        })
    }

    /// A stream that never pushes anything.
    pub fn never() -> Self {
        Self::create(|_| Subscription::empty())
    }

    /// A stream that fails immediately.
    pub fn fail(error: StreamError) -> Self {
        Self::create(move |observer| {
            observer.error(error.clone());
            Subscription::empty()
        })
    }

    /// Subscribe with a callback receiving every notification.
    pub fn subscribe(&self, callback: impl FnMut(Notification<T>) + 'static) -> Subscription {
        let observer = Observer::new(callback);
        let upstream = (self.producer)(observer.clone());
        Subscription::new(move || {
            observer.close();
            drop(upstream);
        })
    }

    /// Subscribe to values only, ignoring terminal notifications.
    pub fn subscribe_next(&self, mut callback: impl FnMut(T) + 'static) -> Subscription {
        self.subscribe(move |notification| {
            if let Notification::Next(value) = notification {
                callback(value);
            }
        })
    }

    /// Transform every value.
    pub fn map<U: Clone + 'static>(&self, f: impl Fn(T) -> U + 'static) -> Stream<U> {
        let source = self.clone();
        let f = Rc::new(f);
        Stream::create(move |observer: Observer<U>| {
            let f = Rc::clone(&f);
            source.subscribe(move |notification| observer.notify(notification.map(|v| f(v))))
        })
    }

    /// Keep only values satisfying `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Stream<T> {
        let source = self.clone();
        let predicate = Rc::new(predicate);
        Stream::create(move |observer: Observer<T>| {
            let predicate = Rc::clone(&predicate);
            source.subscribe(move |notification| match notification {
                Notification::Next(value) => {
                    if predicate(&value) {
                        observer.next(value);
                    }
                }
                terminal => observer.notify(terminal),
            })
        })
    }

    /// Stateful left fold.
    ///
    /// Emits `f(&acc, value)` for every source value and keeps it as the new
    /// accumulator. The seed itself is not emitted; prepend it with
    /// [`start_with`](Stream::start_with) when the initial state should be
    /// visible. Each subscription folds from its own copy of `seed`.
    pub fn scan<A: Clone + 'static>(&self, seed: A, f: impl Fn(&A, T) -> A + 'static) -> Stream<A> {
        let source = self.clone();
        let f = Rc::new(f);
        Stream::create(move |observer: Observer<A>| {
            let f = Rc::clone(&f);
            let mut acc = seed.clone();
            source.subscribe(move |notification| match notification {
                Notification::Next(value) => {
                    acc = f(&acc, value);
                    observer.next(acc.clone());
                }
                Notification::Error(e) => observer.error(e),
                Notification::Complete => observer.complete(),
            })
        })
    }

    /// Emit `seed` on subscribe, then everything from this stream.
    pub fn start_with(&self, seed: T) -> Stream<T> {
        let source = self.clone();
        Stream::create(move |observer: Observer<T>| {
            observer.next(seed.clone());
            if observer.is_closed() {
                return Subscription::empty();
            }
            source.subscribe(move |notification| observer.notify(notification))
        })
    }

    /// Interleave values from both streams.
    ///
    /// Completes once both sides have completed; fails as soon as either
    /// side fails.
    pub fn merge(&self, other: &Stream<T>) -> Stream<T> {
        let left = self.clone();
        let right = other.clone();
        Stream::create(move |observer: Observer<T>| {
            let remaining = Rc::new(RefCell::new(2usize));
            let subscriptions = [&left, &right].map(|source| {
                let observer = observer.clone();
                let remaining = Rc::clone(&remaining);
                source.subscribe(move |notification| match notification {
                    Notification::Complete => {
                        let done = {
                            let mut remaining = remaining.borrow_mut();
                            *remaining -= 1;
                            *remaining == 0
                        };
                        if done {
                            observer.complete();
                        }
                    }
                    notification => observer.notify(notification),
                })
            });
            Subscription::all(subscriptions)
        })
    }

    /// Collect everything pushed synchronously during subscription.
    ///
    /// Mostly useful in tests and for finite streams built with [`Stream::of`].
    pub fn collect_sync(&self) -> Result<Vec<T>, StreamError> {
        let out = Rc::new(RefCell::new(Ok(Vec::new())));
        let sink = Rc::clone(&out);
        let _subscription = self.subscribe(move |notification| {
            let mut out = sink.borrow_mut();
            match notification {
                Notification::Next(value) => {
                    if let Ok(values) = out.as_mut() {
                        values.push(value);
                    }
                }
                Notification::Error(e) => *out = Err(e),
                Notification::Complete => {}
            }
        });
        out.replace(Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Subject;

    fn record<T: Clone + 'static>(stream: &Stream<T>) -> (Rc<RefCell<Vec<Notification<T>>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let sub = stream.subscribe(move |n| l.borrow_mut().push(n));
        (log, sub)
    }

    #[test]
    fn of_pushes_then_completes() {
        let (log, _sub) = record(&Stream::of([1, 2, 3]));
        assert_eq!(
            *log.borrow(),
            vec![
                Notification::Next(1),
                Notification::Next(2),
                Notification::Next(3),
                Notification::Complete
            ]
        );
    }

    #[test]
    fn map_and_filter() {
        let values = Stream::of(1..=6)
            .filter(|v| v % 2 == 0)
            .map(|v| v * 10)
            .collect_sync()
            .unwrap();
        assert_eq!(values, vec![20, 40, 60]);
    }

    #[test]
    fn scan_does_not_emit_seed() {
        let values = Stream::of([1, 2, 3]).scan(0, |acc, v| acc + v).collect_sync().unwrap();
        assert_eq!(values, vec![1, 3, 6]);
    }

    #[test]
    fn scan_with_start_with_emits_seed_first() {
        let values = Stream::of([1, 2, 3])
            .scan(10, |acc, v| acc + v)
            .start_with(10)
            .collect_sync()
            .unwrap();
        assert_eq!(values, vec![10, 11, 13, 16]);
    }

    #[test]
    fn scan_state_is_per_subscription() {
        let subject = Subject::new();
        let sums = subject.stream().scan(0, |acc, v: i32| acc + v);
        let (first, _s1) = record(&sums);
        subject.next(5);
        let (second, _s2) = record(&sums);
        subject.next(1);

        assert_eq!(
            *first.borrow(),
            vec![Notification::Next(5), Notification::Next(6)]
        );
        assert_eq!(*second.borrow(), vec![Notification::Next(1)]);
    }

    #[test]
    fn errors_propagate_through_operators() {
        let result = Stream::<i32>::fail(StreamError::new("boom"))
            .map(|v| v + 1)
            .scan(0, |a, v| a + v)
            .collect_sync();
        assert_eq!(result, Err(StreamError::new("boom")));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let subject = Subject::new();
        let (log, sub) = record(&subject.stream().map(|v: i32| v * 2));
        subject.next(1);
        drop(sub);
        subject.next(2);
        assert_eq!(*log.borrow(), vec![Notification::Next(2)]);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn merge_interleaves_and_waits_for_both() {
        let a = Subject::new();
        let b = Subject::new();
        let (log, _sub) = record(&a.stream().merge(&b.stream()));
        a.next(1);
        b.next(2);
        a.complete();
        b.next(3);
        b.complete();
        assert_eq!(
            *log.borrow(),
            vec![
                Notification::Next(1),
                Notification::Next(2),
                Notification::Next(3),
                Notification::Complete
            ]
        );
    }

    #[test]
    fn never_and_empty() {
        assert_eq!(Stream::<i32>::empty().collect_sync().unwrap(), Vec::<i32>::new());
        let (log, _sub) = record(&Stream::<i32>::never());
        assert!(log.borrow().is_empty());
    }
}
