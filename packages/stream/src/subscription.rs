//! RAII subscription handles.

use std::fmt;

/// Handle to an active subscription.
///
/// Dropping the handle (or calling [`unsubscribe`](Subscription::unsubscribe))
/// stops delivery to the subscriber immediately and runs the producer's
/// teardown, releasing any listeners it held.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Create a subscription that runs `teardown` when it ends.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self { teardown: None }
    }

    /// Combine several subscriptions into one that ends all of them.
    ///
    /// Teardown runs in the given order.
    pub fn all(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let subscriptions: Vec<Subscription> = subscriptions.into_iter().collect();
        if subscriptions.is_empty() {
            return Self::empty();
        }
        Self::new(move || drop(subscriptions))
    }

    /// End the subscription now.
    pub fn unsubscribe(mut self) {
        self.run_teardown();
    }

    /// Check whether the teardown has already run.
    pub fn is_closed(&self) -> bool {
        self.teardown.is_none()
    }

    fn run_teardown(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_teardown();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn drop_runs_teardown_once() {
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let sub = Subscription::new(move || *c.borrow_mut() += 1);
        drop(sub);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn unsubscribe_runs_teardown() {
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        Subscription::new(move || *c.borrow_mut() += 1).unsubscribe();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn all_tears_down_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let subs = (0..3).map(|i| {
            let log = Rc::clone(&log);
            Subscription::new(move || log.borrow_mut().push(i))
        });
        drop(Subscription::all(subs));
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn empty_is_closed() {
        assert!(Subscription::empty().is_closed());
        assert!(!Subscription::new(|| {}).is_closed());
    }
}
