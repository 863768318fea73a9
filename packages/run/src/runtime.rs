//! Circular wiring of an application to its drivers.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use cycle_stream::Subscription;
use tracing::{debug, trace};

use crate::collections::{Drivers, Requests, Responses};
use crate::driver::{ErasedDriver, RequestLeases};
use crate::error::{Result, RunError};

/// A driver that has been started, with its real response.
struct Started {
    name: String,
    driver: Rc<dyn ErasedDriver>,
    response: Rc<dyn Any>,
}

/// A running application.
///
/// Holds the bindings between placeholder and real responses, which keep the
/// whole cycle alive, and every subscription drivers made to their requests.
/// Dropping the runtime disposes it.
#[must_use = "dropping a Runtime disposes it immediately"]
pub struct Runtime {
    requests: Requests,
    responses: Responses,
    bindings: Vec<Subscription>,
    leases: RequestLeases,
    started: Vec<Started>,
    disposed: bool,
}

impl Runtime {
    /// The request streams `main` returned.
    pub fn requests(&self) -> &Requests {
        &self.requests
    }

    /// The real driver responses.
    pub fn responses(&self) -> &Responses {
        &self.responses
    }

    /// Check whether [`dispose`](Runtime::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Stop the application.
    ///
    /// Drops every binding, so nothing more reaches `main`'s streams, ends
    /// every driver's request subscription, then disposes each driver's
    /// response. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        debug!(drivers = self.started.len(), "disposing runtime");

        self.bindings.clear();
        self.leases.release();
        for started in self.started.drain(..) {
            trace!(driver = %started.name, "disposing driver response");
            started.driver.dispose(&started.response);
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("requests", &self.requests)
            .field("responses", &self.responses)
            .field("disposed", &self.disposed)
            .finish()
    }
}

/// Run `main` against `drivers`.
///
/// 1. Every driver gets a placeholder response.
/// 2. `main` is called once with the placeholders and returns its requests.
/// 3. The requests are checked against the drivers, then each driver is
///    started with its request stream.
/// 4. Each placeholder is bound to its driver's real response. Values only
///    reach `main`'s streams from this point on.
///
/// Drivers start in name order. If anything fails, the drivers already
/// started are disposed before the error is returned.
///
/// # Errors
///
/// - `UnknownDriver` when `main` returns requests for a driver not in
///   `drivers`
/// - `MissingRequests` when a driver that needs requests gets none
/// - `RequestType` when requests do not match the driver's request type
/// - anything `main` or a driver returns
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use cycle_run::{driver_fn, run, Drivers, Requests, RunError, Sink};
/// use cycle_stream::{Stream, Subject};
///
/// let output = Rc::new(RefCell::new(Vec::new()));
/// let sink = output.clone();
/// let input = Subject::new();
/// let source = input.stream();
///
/// let drivers = Drivers::new()
///     .with("input", driver_fn(move |_: Stream<()>| -> Result<Stream<i32>, RunError> {
///         Ok(source.clone())
///     }).without_requests())
///     .with("output", driver_fn(move |requests: Stream<i32>| -> Result<Sink, RunError> {
///         let sink = sink.clone();
///         Ok(Sink::new(requests.subscribe_next(move |v| sink.borrow_mut().push(v))))
///     }));
///
/// let runtime = run(|responses| {
///     let numbers = responses.get::<Stream<i32>>("input")?;
///     Ok(Requests::new().with("output", numbers.map(|n| n * 10)))
/// }, drivers).unwrap();
///
/// input.next(4);
/// assert_eq!(*output.borrow(), vec![40]);
/// drop(runtime);
/// ```
pub fn run<M>(main: M, drivers: Drivers) -> Result<Runtime>
where
    M: FnOnce(&Responses) -> Result<Requests>,
{
    debug!(drivers = drivers.len(), "wiring application");

    let mut placeholders = Responses::default();
    let mut proxies: Vec<(String, Box<dyn Any>)> = Vec::with_capacity(drivers.len());
    for (name, driver) in drivers.iter() {
        let (placeholder, proxy) = driver.proxy();
        placeholders.insert(name.clone(), placeholder);
        proxies.push((name.clone(), proxy));
    }

    let requests = main(&placeholders)?;

    if let Some(unknown) = requests
        .names()
        .find(|name| !drivers.iter().any(|(d, _)| d.as_str() == *name))
    {
        return Err(RunError::UnknownDriver(unknown.to_string()));
    }
    for (name, driver) in drivers.iter() {
        if driver.needs_requests() && requests.raw(name).is_none() {
            return Err(RunError::MissingRequests {
                driver: name.clone(),
            });
        }
    }

    let mut runtime = Runtime {
        requests,
        responses: Responses::default(),
        bindings: Vec::with_capacity(proxies.len()),
        leases: RequestLeases::default(),
        started: Vec::with_capacity(proxies.len()),
        disposed: false,
    };

    // An early return drops `runtime`, disposing what has started.
    for (name, driver) in drivers.iter() {
        trace!(driver = %name, "starting driver");
        let response = driver.drive(name, runtime.requests.raw(name), &runtime.leases)?;
        runtime.responses.insert(name.clone(), Rc::clone(&response));
        runtime.started.push(Started {
            name: name.clone(),
            driver: Rc::clone(driver),
            response,
        });
    }

    for ((name, proxy), started) in proxies.into_iter().zip(&runtime.started) {
        trace!(driver = %name, "binding response");
        let binding = started.driver.bind(&name, proxy, &started.response)?;
        runtime.bindings.push(binding);
    }

    debug!(drivers = runtime.started.len(), "application running");
    Ok(runtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{driver_fn, Response, Sink};
    use cycle_stream::{Stream, Subject};
    use std::cell::{Cell, RefCell};

    type Log = Rc<RefCell<Vec<i32>>>;

    /// Records requests; its response is whatever `response` pushes.
    fn recording(log: &Log, response: &Subject<i32>) -> impl crate::Driver {
        let log = Rc::clone(log);
        let response = response.clone();
        driver_fn(move |requests: Stream<i32>| -> Result<Stream<i32>> {
            let log = Rc::clone(&log);
            let sub = requests.subscribe_next(move |v| log.borrow_mut().push(v));
            // Keep the subscription alive as long as the response stream is.
            let sub = Rc::new(RefCell::new(Some(sub)));
            let source = response.stream();
            Ok(Stream::create(move |observer| {
                let keep = Rc::clone(&sub);
                let inner = source.subscribe(move |n| observer.notify(n));
                Subscription::new(move || {
                    keep.borrow_mut().take();
                    drop(inner);
                })
            }))
        })
    }

    #[test]
    fn circular_counter() {
        let log: Log = Rc::default();
        let clicks = Subject::new();
        let drivers = Drivers::new().with("counter", recording(&log, &clicks));

        let _runtime = run(
            |responses| {
                let clicks = responses.get::<Stream<i32>>("counter")?;
                let count = clicks.scan(0, |n, step| n + step).start_with(0);
                Ok(Requests::new().with("counter", count))
            },
            drivers,
        )
        .unwrap();

        clicks.next(1);
        clicks.next(1);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn unknown_driver_in_requests() {
        let err = run(
            |_| Ok(Requests::new().with("nope", Stream::<i32>::never())),
            Drivers::new(),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::UnknownDriver(name) if name == "nope"));
    }

    #[test]
    fn missing_requests_is_reported() {
        let log: Log = Rc::default();
        let drivers = Drivers::new().with("counter", recording(&log, &Subject::new()));
        let err = run(|_| Ok(Requests::new()), drivers).unwrap_err();
        assert!(matches!(err, RunError::MissingRequests { driver } if driver == "counter"));
    }

    #[test]
    fn main_errors_propagate() {
        let err = run(
            |responses| {
                responses.get::<Stream<String>>("missing")?;
                Ok(Requests::new())
            },
            Drivers::new(),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::UnknownDriver(_)));
    }

    #[test]
    fn dispose_stops_the_cycle() {
        let log: Log = Rc::default();
        let clicks = Subject::new();
        let drivers = Drivers::new().with("counter", recording(&log, &clicks));
        let mut runtime = run(
            |responses| {
                let clicks = responses.get::<Stream<i32>>("counter")?;
                Ok(Requests::new().with("counter", clicks))
            },
            drivers,
        )
        .unwrap();

        clicks.next(5);
        runtime.dispose();
        assert!(runtime.is_disposed());
        clicks.next(6);
        assert_eq!(*log.borrow(), vec![5]);
        assert_eq!(clicks.observer_count(), 0);
    }

    #[derive(Clone)]
    struct Counted(Rc<Cell<usize>>);

    impl Response for Counted {
        type Proxy = ();

        fn proxy() -> (Self, ()) {
            (Counted(Rc::default()), ())
        }

        fn bind(_: (), _: &Self) -> Result<Subscription> {
            Ok(Subscription::empty())
        }

        fn dispose(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn drop_disposes_responses_once() {
        let disposed = Rc::new(Cell::new(0));
        let d = Rc::clone(&disposed);
        let drivers = Drivers::new().with(
            "res",
            driver_fn(move |_: Stream<()>| -> Result<Counted> { Ok(Counted(Rc::clone(&d))) })
                .without_requests(),
        );
        let mut runtime = run(|_| Ok(Requests::new()), drivers).unwrap();
        runtime.dispose();
        drop(runtime);
        assert_eq!(disposed.get(), 1);
    }

    #[test]
    fn failed_driver_disposes_started_ones() {
        let disposed = Rc::new(Cell::new(0));
        let d = Rc::clone(&disposed);
        let drivers = Drivers::new()
            .with(
                "a",
                driver_fn(move |_: Stream<()>| -> Result<Counted> { Ok(Counted(Rc::clone(&d))) })
                    .without_requests(),
            )
            .with(
                "b",
                driver_fn(|_: Stream<()>| -> Result<Stream<()>> {
                    Err(RunError::driver(cycle_stream::StreamError::new("no socket")))
                })
                .without_requests(),
            );
        let err = run(|_| Ok(Requests::new()), drivers).unwrap_err();
        assert!(matches!(err, RunError::Driver(_)));
        assert_eq!(disposed.get(), 1);
    }

    /// `main` sends `input`'s values to the `output` driver.
    fn forward(input: &Subject<i32>) -> impl FnOnce(&Responses) -> Result<Requests> {
        let numbers = input.stream();
        move |_| Ok(Requests::new().with("output", numbers))
    }

    #[test]
    fn sink_driver_stops_on_dispose() {
        let log: Log = Rc::default();
        let input = Subject::new();
        let l = Rc::clone(&log);
        let drivers = Drivers::new().with(
            "output",
            driver_fn(move |requests: Stream<i32>| -> Result<Sink> {
                let l = Rc::clone(&l);
                Ok(Sink::new(requests.subscribe_next(move |v| l.borrow_mut().push(v))))
            }),
        );
        let mut runtime = run(forward(&input), drivers).unwrap();
        let sink = runtime.responses().get::<Sink>("output").unwrap();
        assert!(sink.is_active());

        input.next(1);
        runtime.dispose();
        input.next(2);

        assert_eq!(*log.borrow(), vec![1]);
        assert!(!sink.is_active());
        assert_eq!(input.observer_count(), 0);
    }

    #[test]
    fn request_subscriptions_end_even_when_kept_by_the_driver() {
        let log: Log = Rc::default();
        let kept = Rc::new(RefCell::new(Vec::new()));
        let input = Subject::new();
        let l = Rc::clone(&log);
        let k = Rc::clone(&kept);
        let drivers = Drivers::new().with(
            "output",
            driver_fn(move |requests: Stream<i32>| -> Result<Stream<()>> {
                let l = Rc::clone(&l);
                k.borrow_mut()
                    .push(requests.subscribe_next(move |v| l.borrow_mut().push(v)));
                Ok(Stream::never())
            }),
        );
        let runtime = run(forward(&input), drivers).unwrap();

        input.next(1);
        drop(runtime);
        input.next(2);

        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(input.observer_count(), 0);
        assert_eq!(kept.borrow().len(), 1);
    }
}
