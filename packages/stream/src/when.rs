//! Pairwise joins of two streams.

use std::cell::RefCell;
use std::rc::Rc;

use crate::observer::{Notification, Observer};
use crate::stream::Stream;
use crate::subscription::Subscription;

struct PairState<A, B> {
    a: Option<A>,
    b: Option<B>,
    a_done: bool,
    b_done: bool,
}

impl<A, B> PairState<A, B> {
    /// No further pair can form once a finished side has nothing pending.
    fn exhausted(&self) -> bool {
        (self.a_done && self.a.is_none()) || (self.b_done && self.b.is_none())
    }

    fn offer_a(&mut self, a: A) -> Option<(A, B)> {
        match self.b.take() {
            Some(b) => Some((a, b)),
            None => {
                self.a = Some(a);
                None
            }
        }
    }

    fn offer_b(&mut self, b: B) -> Option<(A, B)> {
        match self.a.take() {
            Some(a) => Some((a, b)),
            None => {
                self.b = Some(b);
                None
            }
        }
    }
}

/// Join `a` and `b` pairwise, emitting `combine(a, b)` for each pair.
///
/// Each side holds at most one pending value, and a newer value replaces an
/// older one. When the side that is behind produces, its value is combined
/// with the other side's pending value and both slots are cleared. So
/// `a1, b1, a2` emits `combine(a1, b1)` and leaves `a2` waiting, while
/// `a1, a2, b1` emits `combine(a2, b1)`.
///
/// A failure on either side fails the joined stream. The joined stream
/// completes as soon as one side has completed with nothing pending.
///
/// # Example
///
/// ```
/// use cycle_stream::{when_pair_then_do, Stream};
///
/// let joined = when_pair_then_do(&Stream::of([1]), &Stream::of(["one"]), |n, s| format!("{n}={s}"));
/// assert_eq!(joined.collect_sync().unwrap(), vec!["1=one".to_string()]);
/// ```
pub fn when_pair_then_do<A, B, C>(
    a: &Stream<A>,
    b: &Stream<B>,
    combine: impl Fn(A, B) -> C + 'static,
) -> Stream<C>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
{
    let left = a.clone();
    let right = b.clone();
    let combine = Rc::new(combine);

    Stream::create(move |observer: Observer<C>| {
        let state = Rc::new(RefCell::new(PairState {
            a: None,
            b: None,
            a_done: false,
            b_done: false,
        }));

        let left_sub = {
            let state = Rc::clone(&state);
            let observer = observer.clone();
            let combine = Rc::clone(&combine);
            left.subscribe(move |notification| match notification {
                Notification::Next(a) => {
                    // The borrow ends before pushing; the push may cycle back.
                    let pair = state.borrow_mut().offer_a(a);
                    if let Some((a, b)) = pair {
                        emit(&state, &observer, combine(a, b));
                    }
                }
                Notification::Error(e) => observer.error(e),
                Notification::Complete => {
                    state.borrow_mut().a_done = true;
                    finish_if_exhausted(&state, &observer);
                }
            })
        };
        if observer.is_closed() {
            return left_sub;
        }

        let right_sub = {
            let state = Rc::clone(&state);
            let observer = observer.clone();
            let combine = Rc::clone(&combine);
            right.subscribe(move |notification| match notification {
                Notification::Next(b) => {
                    let pair = state.borrow_mut().offer_b(b);
                    if let Some((a, b)) = pair {
                        emit(&state, &observer, combine(a, b));
                    }
                }
                Notification::Error(e) => observer.error(e),
                Notification::Complete => {
                    state.borrow_mut().b_done = true;
                    finish_if_exhausted(&state, &observer);
                }
            })
        };

        Subscription::all([left_sub, right_sub])
    })
}

fn emit<A, B, C>(state: &RefCell<PairState<A, B>>, observer: &Observer<C>, value: C) {
    observer.next(value);
    finish_if_exhausted(state, observer);
}

fn finish_if_exhausted<A, B, C>(state: &RefCell<PairState<A, B>>, observer: &Observer<C>) {
    let exhausted = state.borrow().exhausted();
    if exhausted {
        observer.complete();
    }
}

/// The left half of a join pattern, created by [`Stream::and`].
///
/// Reads like the `when(a.and(b).thenDo(f))` join pattern:
///
/// ```
/// use cycle_stream::Stream;
///
/// let sums = Stream::of([1, 2]).and(&Stream::of([10, 20])).then_do(|a, b| a + b);
/// assert_eq!(sums.collect_sync().unwrap(), vec![12]);
/// ```
///
/// Both `of` streams push synchronously: the left side runs to completion
/// first, leaving only its newest value pending, and completes the join as
/// soon as that value is paired.
pub struct Pattern<A, B> {
    a: Stream<A>,
    b: Stream<B>,
}

impl<A: Clone + 'static, B: Clone + 'static> Pattern<A, B> {
    /// Finish the pattern; see [`when_pair_then_do`].
    pub fn then_do<C: Clone + 'static>(self, combine: impl Fn(A, B) -> C + 'static) -> Stream<C> {
        when_pair_then_do(&self.a, &self.b, combine)
    }
}

impl<A: Clone + 'static> Stream<A> {
    /// Start a join pattern with `other`.
    pub fn and<B: Clone + 'static>(&self, other: &Stream<B>) -> Pattern<A, B> {
        Pattern {
            a: self.clone(),
            b: other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;
    use crate::Subject;

    fn record<T: Clone + 'static>(
        stream: &Stream<T>,
    ) -> (Rc<RefCell<Vec<Notification<T>>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let sub = stream.subscribe(move |n| l.borrow_mut().push(n));
        (log, sub)
    }

    #[test]
    fn a1_b1_a2_emits_one_pair() {
        let a = Subject::new();
        let b = Subject::new();
        let (log, _sub) = record(&when_pair_then_do(&a.stream(), &b.stream(), |x: i32, y: &str| {
            format!("{x}{y}")
        }));

        a.next(1);
        b.next("b");
        a.next(2);
        assert_eq!(*log.borrow(), vec![Notification::Next("1b".to_string())]);
    }

    #[test]
    fn newest_pending_value_wins() {
        let a = Subject::new();
        let b = Subject::new();
        let (log, _sub) = record(&a.stream().and(&b.stream()).then_do(|x: i32, y: i32| (x, y)));

        a.next(1);
        a.next(2);
        b.next(10);
        b.next(20);
        b.next(30);
        a.next(3);
        assert_eq!(
            *log.borrow(),
            vec![Notification::Next((2, 10)), Notification::Next((3, 30))]
        );
    }

    #[test]
    fn combine_order_is_a_then_b() {
        let a = Subject::new();
        let b = Subject::new();
        let (log, _sub) = record(&a.stream().and(&b.stream()).then_do(|x: &str, y: &str| {
            format!("{x}-{y}")
        }));
        b.next("right");
        a.next("left");
        assert_eq!(*log.borrow(), vec![Notification::Next("left-right".to_string())]);
    }

    #[test]
    fn error_on_either_side_fails() {
        let a: Subject<i32> = Subject::new();
        let b: Subject<i32> = Subject::new();
        let (log, _sub) = record(&a.stream().and(&b.stream()).then_do(|x, y| x + y));
        b.error(StreamError::new("input gone"));
        a.next(1);
        assert_eq!(
            *log.borrow(),
            vec![Notification::Error(StreamError::new("input gone"))]
        );
    }

    #[test]
    fn completes_when_no_pair_is_possible() {
        let a: Subject<i32> = Subject::new();
        let b: Subject<i32> = Subject::new();
        let (log, _sub) = record(&a.stream().and(&b.stream()).then_do(|x, y| x + y));

        b.next(5);
        b.complete();
        // `b` still has a pending value, so the join stays open.
        assert!(log.borrow().is_empty());

        a.next(1);
        assert_eq!(
            *log.borrow(),
            vec![Notification::Next(6), Notification::Complete]
        );
    }
}
