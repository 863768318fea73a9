//! Observers: the receiving end of a stream.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::error::StreamError;

/// One event pushed down a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<T> {
    /// A value.
    Next(T),
    /// Terminal failure.
    Error(StreamError),
    /// Terminal completion.
    Complete,
}

impl<T> Notification<T> {
    /// Check if this notification ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Next(_))
    }

    /// Transform the value of a `Next`, passing terminals through.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Notification<U> {
        match self {
            Notification::Next(value) => Notification::Next(f(value)),
            Notification::Error(e) => Notification::Error(e),
            Notification::Complete => Notification::Complete,
        }
    }
}

/// The sink a producer pushes into.
///
/// Observers serialize delivery: a notification pushed while the observer is
/// still handling the previous one (a re-entrant push through a cycle) is
/// queued and delivered once the current callback returns. After a terminal
/// notification, or once the subscription ends, further pushes are ignored.
pub struct Observer<T> {
    inner: Rc<ObserverInner<T>>,
}

struct ObserverInner<T> {
    callback: RefCell<Box<dyn FnMut(Notification<T>)>>,
    queue: RefCell<VecDeque<Notification<T>>>,
    delivering: Cell<bool>,
    /// A terminal notification has been accepted.
    stopped: Cell<bool>,
    /// The subscriber is gone; nothing more is delivered.
    closed: Cell<bool>,
}

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("stopped", &self.inner.stopped.get())
            .field("closed", &self.inner.closed.get())
            .finish()
    }
}

impl<T> Observer<T> {
    pub(crate) fn new(callback: impl FnMut(Notification<T>) + 'static) -> Self {
        Self {
            inner: Rc::new(ObserverInner {
                callback: RefCell::new(Box::new(callback)),
                queue: RefCell::new(VecDeque::new()),
                delivering: Cell::new(false),
                stopped: Cell::new(false),
                closed: Cell::new(false),
            }),
        }
    }

    /// Push a value.
    pub fn next(&self, value: T) {
        self.notify(Notification::Next(value));
    }

    /// Fail the stream.
    pub fn error(&self, error: StreamError) {
        self.notify(Notification::Error(error));
    }

    /// Complete the stream.
    pub fn complete(&self) {
        self.notify(Notification::Complete);
    }

    /// Check whether this observer still accepts notifications.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get() || self.inner.stopped.get()
    }

    /// Stop all delivery, dropping anything still queued.
    pub(crate) fn close(&self) {
        self.inner.closed.set(true);
        self.inner.queue.borrow_mut().clear();
    }

    /// Push a notification, delivering it now unless a delivery is running.
    pub fn notify(&self, notification: Notification<T>) {
        let inner = &self.inner;
        if inner.closed.get() || inner.stopped.get() {
            return;
        }
        if notification.is_terminal() {
            inner.stopped.set(true);
        }
        inner.queue.borrow_mut().push_back(notification);
        if inner.delivering.get() {
            return;
        }

        inner.delivering.set(true);
        loop {
            if inner.closed.get() {
                inner.queue.borrow_mut().clear();
                break;
            }
            let next = inner.queue.borrow_mut().pop_front();
            let Some(notification) = next else {
                break;
            };
            let terminal = notification.is_terminal();
            {
                let mut callback = inner.callback.borrow_mut();
                (&mut **callback)(notification);
            }
            if terminal {
                inner.closed.set(true);
            }
        }
        inner.delivering.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> (Observer<i32>, Rc<RefCell<Vec<Notification<i32>>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        (Observer::new(move |n| l.borrow_mut().push(n)), log)
    }

    #[test]
    fn delivers_in_order() {
        let (observer, log) = recording();
        observer.next(1);
        observer.next(2);
        observer.complete();
        assert_eq!(
            *log.borrow(),
            vec![
                Notification::Next(1),
                Notification::Next(2),
                Notification::Complete
            ]
        );
    }

    #[test]
    fn ignores_after_terminal() {
        let (observer, log) = recording();
        observer.error(StreamError::new("boom"));
        observer.next(1);
        observer.complete();
        assert_eq!(log.borrow().len(), 1);
        assert!(observer.is_closed());
    }

    #[test]
    fn close_stops_delivery() {
        let (observer, log) = recording();
        observer.close();
        observer.next(1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn reentrant_push_is_queued() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<Observer<i32>>>> = Rc::new(RefCell::new(None));

        let o = Rc::clone(&order);
        let s = Rc::clone(&slot);
        let observer = Observer::new(move |n| {
            if let Notification::Next(v) = n {
                o.borrow_mut().push(format!("start {}", v));
                if v == 1 {
                    // Push while still handling 1.
                    if let Some(me) = s.borrow().as_ref() {
                        me.next(2);
                    }
                }
                o.borrow_mut().push(format!("end {}", v));
            }
        });
        *slot.borrow_mut() = Some(observer.clone());

        observer.next(1);
        assert_eq!(
            *order.borrow(),
            vec!["start 1", "end 1", "start 2", "end 2"]
        );
        slot.borrow_mut().take();
    }

    #[test]
    fn notification_map() {
        assert_eq!(Notification::Next(2).map(|v| v * 2), Notification::Next(4));
        assert_eq!(
            Notification::<i32>::Complete.map(|v| v * 2),
            Notification::Complete
        );
    }
}
