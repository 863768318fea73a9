//! Hot multicast streams.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::StreamError;
use crate::observer::{Notification, Observer};
use crate::stream::Stream;
use crate::subscription::Subscription;

/// A hot stream you push into by hand.
///
/// Every value pushed with [`next`](Subject::next) goes to the observers
/// subscribed at that moment, in subscription order. There is no buffering:
/// a new subscriber only sees later values. A [`seeded`](Subject::seeded)
/// subject is the exception: it remembers the latest value and hands it to
/// each new subscriber first.
///
/// After `error` or `complete`, the subject is terminated; late subscribers
/// receive the terminal notification right away.
pub struct Subject<T> {
    inner: Rc<SubjectInner<T>>,
}

struct SubjectInner<T> {
    observers: RefCell<Vec<(u64, Observer<T>)>>,
    next_id: Cell<u64>,
    terminal: RefCell<Option<Notification<T>>>,
    latest: RefCell<Option<T>>,
    replay_latest: bool,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("observers", &self.inner.observers.borrow().len())
            .field("terminated", &self.inner.terminal.borrow().is_some())
            .finish()
    }
}

impl<T: Clone + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Subject<T> {
    /// Create a subject with no memory.
    pub fn new() -> Self {
        Self::with_inner(None, false)
    }

    /// Create a subject that replays its latest value to new subscribers.
    pub fn seeded(initial: T) -> Self {
        Self::with_inner(Some(initial), true)
    }

    fn with_inner(latest: Option<T>, replay_latest: bool) -> Self {
        Self {
            inner: Rc::new(SubjectInner {
                observers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                terminal: RefCell::new(None),
                latest: RefCell::new(latest),
                replay_latest,
            }),
        }
    }

    /// Push a value to every current observer.
    pub fn next(&self, value: T) {
        if self.is_terminated() {
            return;
        }
        if self.inner.replay_latest {
            *self.inner.latest.borrow_mut() = Some(value.clone());
        }
        for observer in self.snapshot() {
            observer.next(value.clone());
        }
    }

    /// Fail every current and future observer.
    pub fn error(&self, error: StreamError) {
        self.terminate(Notification::Error(error));
    }

    /// Complete every current and future observer.
    pub fn complete(&self) {
        self.terminate(Notification::Complete);
    }

    /// Check whether `error` or `complete` has been called.
    pub fn is_terminated(&self) -> bool {
        self.inner.terminal.borrow().is_some()
    }

    /// The latest value of a seeded subject.
    pub fn latest(&self) -> Option<T> {
        self.inner.latest.borrow().clone()
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        self.inner
            .observers
            .borrow()
            .iter()
            .filter(|(_, o)| !o.is_closed())
            .count()
    }

    /// The subject as a stream.
    pub fn stream(&self) -> Stream<T> {
        let weak: Weak<SubjectInner<T>> = Rc::downgrade(&self.inner);
        Stream::create(move |observer: Observer<T>| {
            let Some(inner) = weak.upgrade() else {
                observer.complete();
                return Subscription::empty();
            };

            let terminal = inner.terminal.borrow().clone();
            if let Some(terminal) = terminal {
                observer.notify(terminal);
                return Subscription::empty();
            }

            let id = inner.next_id.get();
            inner.next_id.set(id + 1);
            inner.observers.borrow_mut().push((id, observer.clone()));

            if inner.replay_latest {
                let latest = inner.latest.borrow().clone();
                if let Some(latest) = latest {
                    observer.next(latest);
                }
            }

            let weak = Rc::downgrade(&inner);
            Subscription::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.observers.borrow_mut().retain(|(i, _)| *i != id);
                }
            })
        })
    }

    fn terminate(&self, notification: Notification<T>) {
        if self.is_terminated() {
            return;
        }
        *self.inner.terminal.borrow_mut() = Some(notification.clone());
        let observers: Vec<Observer<T>> = self
            .inner
            .observers
            .borrow_mut()
            .drain(..)
            .map(|(_, o)| o)
            .collect();
        for observer in observers {
            observer.notify(notification.clone());
        }
    }

    /// Observers at this instant, dropping closed ones.
    ///
    /// Delivery iterates over the snapshot so observers may subscribe or
    /// unsubscribe from inside a callback.
    fn snapshot(&self) -> Vec<Observer<T>> {
        let mut observers = self.inner.observers.borrow_mut();
        observers.retain(|(_, o)| !o.is_closed());
        observers.iter().map(|(_, o)| o.clone()).collect()
    }
}
