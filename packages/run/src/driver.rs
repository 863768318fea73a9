//! The driver contract.

use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use cycle_stream::{ProxyStream, Stream, Subscription};

use crate::error::{Result, RunError};

/// What a driver hands back to the application.
///
/// Responses take part in circular wiring, so every response type knows how
/// to stand in for itself before the driver has run: [`proxy`](Response::proxy)
/// returns a placeholder the application can use right away plus a handle
/// that [`bind`](Response::bind) later connects to the real response.
pub trait Response: Clone + 'static {
    /// Handle used to connect the placeholder to the real response.
    type Proxy: 'static;

    /// Create a placeholder response and its binding handle.
    fn proxy() -> (Self, Self::Proxy);

    /// Connect the placeholder behind `proxy` to `real`.
    ///
    /// Nothing reaches the placeholder's consumers before this call; values
    /// the real response produced earlier are not replayed.
    fn bind(proxy: Self::Proxy, real: &Self) -> Result<Subscription>;

    /// Release everything the response holds. Called when the runtime is
    /// disposed.
    fn dispose(&self) {}
}

impl<T: Clone + 'static> Response for Stream<T> {
    type Proxy = ProxyStream<T>;

    fn proxy() -> (Self, Self::Proxy) {
        let proxy = ProxyStream::new();
        (proxy.stream(), proxy)
    }

    fn bind(proxy: Self::Proxy, real: &Self) -> Result<Subscription> {
        Ok(proxy.bind(real)?)
    }
}

/// Response of a driver that only consumes requests.
///
/// Holds the driver's request subscription until the runtime is disposed.
///
/// # Example
///
/// ```rust
/// use cycle_run::{driver_fn, RunError, Sink};
/// use cycle_stream::Stream;
///
/// let log = driver_fn(|requests: Stream<String>| -> Result<Sink, RunError> {
///     Ok(Sink::new(requests.subscribe_next(|line| println!("{line}"))))
/// });
/// # let _ = log;
/// ```
#[derive(Clone, Default)]
pub struct Sink {
    subscription: Rc<RefCell<Option<Subscription>>>,
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Sink {
    /// Keep `subscription` alive until the runtime is disposed.
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription: Rc::new(RefCell::new(Some(subscription))),
        }
    }

    /// Check whether the subscription is still held.
    pub fn is_active(&self) -> bool {
        self.subscription
            .borrow()
            .as_ref()
            .is_some_and(|s| !s.is_closed())
    }
}

impl Response for Sink {
    type Proxy = ();

    fn proxy() -> (Self, ()) {
        (Sink::default(), ())
    }

    fn bind(_proxy: (), _real: &Self) -> Result<Subscription> {
        Ok(Subscription::empty())
    }

    fn dispose(&self) {
        let subscription = self.subscription.borrow_mut().take();
        drop(subscription);
    }
}

/// An effectful adapter between the application and the outside world.
///
/// A driver receives the application's request stream once and returns its
/// response. It is the only place side effects happen.
pub trait Driver: 'static {
    /// Item type of the request stream.
    type Request: Clone + 'static;
    /// The response handed to the application.
    type Response: Response;

    /// Start the driver.
    ///
    /// Subscribe to `requests` at most once. The runtime ends that
    /// subscription when it is disposed, whether or not the driver still
    /// holds the handle; sink drivers return a [`Sink`] to hand it over.
    fn drive(&self, requests: Stream<Self::Request>) -> Result<Self::Response>;

    /// Whether the application must provide requests for this driver.
    ///
    /// Source-only drivers return `false` and are driven with a stream that
    /// never emits when the application gives them nothing.
    fn needs_requests(&self) -> bool {
        true
    }
}

/// A driver made from a closure. See [`driver_fn`].
pub struct FnDriver<F, Req, Res> {
    f: F,
    needs_requests: bool,
    _types: PhantomData<fn(Req) -> Res>,
}

impl<F, Req, Res> FnDriver<F, Req, Res> {
    /// Mark the driver as source-only.
    pub fn without_requests(mut self) -> Self {
        self.needs_requests = false;
        self
    }
}

impl<F, Req, Res> fmt::Debug for FnDriver<F, Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDriver")
            .field("request", &type_name::<Req>())
            .field("response", &type_name::<Res>())
            .field("needs_requests", &self.needs_requests)
            .finish()
    }
}

/// Adapt a closure into a [`Driver`].
///
/// # Example
///
/// ```rust
/// use cycle_run::{driver_fn, RunError};
/// use cycle_stream::Stream;
///
/// // Echo every request's length back as the response.
/// let lengths = driver_fn(|requests: Stream<String>| -> Result<Stream<usize>, RunError> {
///     Ok(requests.map(|s| s.len()))
/// });
/// # let _ = lengths;
/// ```
pub fn driver_fn<F, Req, Res>(f: F) -> FnDriver<F, Req, Res>
where
    F: Fn(Stream<Req>) -> Result<Res> + 'static,
    Req: Clone + 'static,
    Res: Response,
{
    FnDriver {
        f,
        needs_requests: true,
        _types: PhantomData,
    }
}

impl<F, Req, Res> Driver for FnDriver<F, Req, Res>
where
    F: Fn(Stream<Req>) -> Result<Res> + 'static,
    Req: Clone + 'static,
    Res: Response,
{
    type Request = Req;
    type Response = Res;

    fn drive(&self, requests: Stream<Req>) -> Result<Res> {
        (self.f)(requests)
    }

    fn needs_requests(&self) -> bool {
        self.needs_requests
    }
}

/// The request subscriptions drivers make, owned by the runtime.
#[derive(Clone, Default)]
pub(crate) struct RequestLeases {
    slots: Rc<RefCell<Vec<Rc<RefCell<Option<Subscription>>>>>>,
    released: Rc<Cell<bool>>,
}

impl RequestLeases {
    /// Wrap `requests` so every subscription to it is also ended by
    /// [`release`](RequestLeases::release).
    pub(crate) fn lease<T: Clone + 'static>(&self, requests: &Stream<T>) -> Stream<T> {
        let leases = self.clone();
        let source = requests.clone();
        Stream::create(move |observer| {
            if leases.released.get() {
                observer.complete();
                return Subscription::empty();
            }
            let inner = source.subscribe(move |notification| observer.notify(notification));
            let slot = Rc::new(RefCell::new(Some(inner)));
            {
                let mut slots = leases.slots.borrow_mut();
                slots.retain(|slot| slot.borrow().is_some());
                slots.push(Rc::clone(&slot));
            }
            Subscription::new(move || {
                let inner = slot.borrow_mut().take();
                drop(inner);
            })
        })
    }

    /// End every leased subscription. Later subscriptions complete at once.
    pub(crate) fn release(&self) {
        self.released.set(true);
        let slots = std::mem::take(&mut *self.slots.borrow_mut());
        for slot in slots {
            let inner = slot.borrow_mut().take();
            drop(inner);
        }
    }

    #[cfg(test)]
    fn active(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter(|slot| slot.borrow().is_some())
            .count()
    }
}

/// Type-erased driver, so differently typed drivers share one registry.
pub(crate) trait ErasedDriver {
    /// Create a placeholder response and its binding handle.
    fn proxy(&self) -> (Rc<dyn Any>, Box<dyn Any>);

    /// Drive with requests erased as `Stream<Request>`, leased from `leases`.
    fn drive(
        &self,
        name: &str,
        requests: Option<&Rc<dyn Any>>,
        leases: &RequestLeases,
    ) -> Result<Rc<dyn Any>>;

    /// Connect a placeholder to the real response.
    fn bind(&self, name: &str, proxy: Box<dyn Any>, real: &Rc<dyn Any>) -> Result<Subscription>;

    /// Dispose a real response.
    fn dispose(&self, real: &Rc<dyn Any>);

    fn needs_requests(&self) -> bool;
}

impl<D: Driver> ErasedDriver for D {
    fn proxy(&self) -> (Rc<dyn Any>, Box<dyn Any>) {
        let (response, proxy) = D::Response::proxy();
        (Rc::new(response), Box::new(proxy))
    }

    fn drive(
        &self,
        name: &str,
        requests: Option<&Rc<dyn Any>>,
        leases: &RequestLeases,
    ) -> Result<Rc<dyn Any>> {
        let requests = match requests {
            Some(requests) => requests
                .downcast_ref::<Stream<D::Request>>()
                .cloned()
                .ok_or_else(|| RunError::RequestType {
                    driver: name.to_string(),
                    expected: type_name::<D::Request>(),
                })?,
            None => Stream::never(),
        };
        let response = Driver::drive(self, leases.lease(&requests))?;
        Ok(Rc::new(response))
    }

    fn bind(&self, name: &str, proxy: Box<dyn Any>, real: &Rc<dyn Any>) -> Result<Subscription> {
        let mismatch = || RunError::ResponseType {
            driver: name.to_string(),
            expected: type_name::<D::Response>(),
        };
        let proxy = proxy
            .downcast::<<D::Response as Response>::Proxy>()
            .map_err(|_| mismatch())?;
        let real = real.downcast_ref::<D::Response>().ok_or_else(mismatch)?;
        D::Response::bind(*proxy, real)
    }

    fn dispose(&self, real: &Rc<dyn Any>) {
        if let Some(real) = real.downcast_ref::<D::Response>() {
            real.dispose();
        }
    }

    fn needs_requests(&self) -> bool {
        Driver::needs_requests(self)
    }
}
