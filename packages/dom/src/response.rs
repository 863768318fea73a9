//! The DOM driver's response: `select(selector)` queries.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use cycle_run::{Response, Result as RunResult};
use cycle_stream::{ProxyStream, Stream, Subscription};

use crate::document::{DomEvent, Node};
use crate::error::DomError;
use crate::selector::Selector;

/// Something `select` can be answered by: a live driver, a placeholder
/// waiting for one, or a mock.
pub(crate) trait Query {
    fn select(&self, selector: &str) -> Result<Selection, DomError>;
    fn diagnostics(&self) -> Stream<DomError>;
    fn dispose(&self);
    fn is_disposed(&self) -> bool;
}

/// Streams for one selector.
pub(crate) trait SelectionSource {
    fn events(&self, event_type: &str, use_capture: bool) -> Stream<DomEvent>;
    fn observable(&self) -> Stream<Node>;
}

/// What the application receives from the DOM driver.
///
/// # Example
///
/// ```rust
/// use cycle_dom::{mock_dom_response, DomEvent};
/// use cycle_stream::Stream;
///
/// let dom = mock_dom_response([(".inc", [("click", Stream::<DomEvent>::never())])]);
/// let clicks = dom.select(".inc").unwrap().events("click");
/// # let _ = clicks;
/// ```
#[derive(Clone)]
pub struct DomResponse {
    query: Rc<dyn Query>,
}

impl fmt::Debug for DomResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomResponse")
            .field("disposed", &self.query.is_disposed())
            .finish()
    }
}

impl DomResponse {
    pub(crate) fn new(query: Rc<dyn Query>) -> Self {
        Self { query }
    }

    /// Query the rendered elements matching `selector`.
    ///
    /// # Errors
    ///
    /// `InvalidSelector` for selectors that do not parse, `DriverDisposed`
    /// once the driver is gone.
    pub fn select(&self, selector: &str) -> Result<Selection, DomError> {
        self.query.select(selector)
    }

    /// Problems the driver ran into while rendering: unknown tags, request
    /// stream failures, failing custom elements.
    pub fn diagnostics(&self) -> Stream<DomError> {
        self.query.diagnostics()
    }

    /// Stop the driver. Further requests cause no DOM changes.
    pub fn dispose(&self) {
        self.query.dispose();
    }

    /// Check whether the driver has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.query.is_disposed()
    }
}

impl Response for DomResponse {
    type Proxy = Rc<DeferredQuery>;

    fn proxy() -> (Self, Self::Proxy) {
        let deferred = Rc::new(DeferredQuery::default());
        (DomResponse::new(Rc::new(Rc::clone(&deferred))), deferred)
    }

    fn bind(proxy: Self::Proxy, real: &Self) -> RunResult<Subscription> {
        Ok(proxy.bind(real)?)
    }

    fn dispose(&self) {
        self.query.dispose();
    }
}

/// The elements matching one selector.
#[derive(Clone)]
pub struct Selection {
    selector: String,
    source: Rc<dyn SelectionSource>,
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selection").field(&self.selector).finish()
    }
}

impl Selection {
    pub(crate) fn new(selector: String, source: Rc<dyn SelectionSource>) -> Self {
        Self { selector, source }
    }

    /// The selector this selection was made with.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Events of `event_type` on matching elements, bubbling phase.
    pub fn events(&self, event_type: &str) -> Stream<DomEvent> {
        self.events_with_capture(event_type, false)
    }

    /// Events of `event_type` on matching elements, listening in the capture
    /// phase when `use_capture` is set.
    ///
    /// Listeners exist only while the stream has subscribers. Elements that
    /// start matching after a render are listened on from then on; elements
    /// that stop matching are released.
    pub fn events_with_capture(&self, event_type: &str, use_capture: bool) -> Stream<DomEvent> {
        self.source.events(event_type, use_capture)
    }

    /// Every matching element after each render, starting with the current
    /// matches.
    pub fn observable(&self) -> Stream<Node> {
        self.source.observable()
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
enum PendingKey {
    Events {
        selector: String,
        event_type: String,
        use_capture: bool,
    },
    Elements {
        selector: String,
    },
}

enum Pending {
    Events(ProxyStream<DomEvent>),
    Elements(ProxyStream<Node>),
}

/// Stands in for the DOM driver's response until the driver has started.
///
/// Every stream requested before then is a proxy; binding connects each to
/// the real selection.
#[derive(Default)]
pub struct DeferredQuery {
    target: RefCell<Option<DomResponse>>,
    pending: RefCell<BTreeMap<PendingKey, Pending>>,
    diagnostics: RefCell<Option<ProxyStream<DomError>>>,
    disposed: Cell<bool>,
}

impl fmt::Debug for DeferredQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQuery")
            .field("bound", &self.target.borrow().is_some())
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}

impl DeferredQuery {
    fn bind(&self, real: &DomResponse) -> Result<Subscription, DomError> {
        *self.target.borrow_mut() = Some(real.clone());
        let pending = std::mem::take(&mut *self.pending.borrow_mut());

        let mut bindings = Vec::with_capacity(pending.len() + 1);
        if let Some(diagnostics) = self.diagnostics.borrow_mut().take() {
            bindings.push(diagnostics.bind(&real.diagnostics()).map_err(stream_bind)?);
        }
        for (key, proxy) in pending {
            let binding = match (key, proxy) {
                (
                    PendingKey::Events {
                        selector,
                        event_type,
                        use_capture,
                    },
                    Pending::Events(proxy),
                ) => {
                    let real = real
                        .select(&selector)?
                        .events_with_capture(&event_type, use_capture);
                    proxy.bind(&real)
                }
                (PendingKey::Elements { selector }, Pending::Elements(proxy)) => {
                    proxy.bind(&real.select(&selector)?.observable())
                }
                _ => continue,
            };
            bindings.push(binding.map_err(stream_bind)?);
        }
        Ok(Subscription::all(bindings))
    }

    fn target(&self) -> Option<DomResponse> {
        self.target.borrow().clone()
    }

    fn events(&self, selector: &str, event_type: &str, use_capture: bool) -> Stream<DomEvent> {
        if let Some(real) = self.target() {
            return match real.select(selector) {
                Ok(selection) => selection.events_with_capture(event_type, use_capture),
                Err(e) => Stream::fail(cycle_stream::StreamError::new(e.to_string())),
            };
        }
        let key = PendingKey::Events {
            selector: selector.to_string(),
            event_type: event_type.to_string(),
            use_capture,
        };
        let mut pending = self.pending.borrow_mut();
        match pending
            .entry(key)
            .or_insert_with(|| Pending::Events(ProxyStream::new()))
        {
            Pending::Events(proxy) => proxy.stream(),
            Pending::Elements(_) => Stream::empty(),
        }
    }

    fn elements(&self, selector: &str) -> Stream<Node> {
        if let Some(real) = self.target() {
            return match real.select(selector) {
                Ok(selection) => selection.observable(),
                Err(e) => Stream::fail(cycle_stream::StreamError::new(e.to_string())),
            };
        }
        let key = PendingKey::Elements {
            selector: selector.to_string(),
        };
        let mut pending = self.pending.borrow_mut();
        match pending
            .entry(key)
            .or_insert_with(|| Pending::Elements(ProxyStream::new()))
        {
            Pending::Elements(proxy) => proxy.stream(),
            Pending::Events(_) => Stream::empty(),
        }
    }
}

fn stream_bind(error: cycle_stream::BindError) -> DomError {
    DomError::Stream(cycle_stream::StreamError::new(error.to_string()))
}

/// A selection made on a placeholder response.
struct DeferredSelection {
    query: Rc<DeferredQuery>,
    selector: String,
}

impl SelectionSource for DeferredSelection {
    fn events(&self, event_type: &str, use_capture: bool) -> Stream<DomEvent> {
        self.query.events(&self.selector, event_type, use_capture)
    }

    fn observable(&self) -> Stream<Node> {
        self.query.elements(&self.selector)
    }
}

/// `Query` for the shared placeholder. Selections keep the `Rc` so they can
/// reach the real response once it is bound.
impl Query for Rc<DeferredQuery> {
    fn select(&self, selector: &str) -> Result<Selection, DomError> {
        if self.is_disposed() {
            return Err(DomError::DriverDisposed);
        }
        let parsed = Selector::parse(selector)?;
        let key = parsed.as_str().to_string();
        Ok(Selection::new(
            key.clone(),
            Rc::new(DeferredSelection {
                query: Rc::clone(self),
                selector: key,
            }),
        ))
    }

    fn diagnostics(&self) -> Stream<DomError> {
        if let Some(real) = self.target() {
            return real.diagnostics();
        }
        self.diagnostics
            .borrow_mut()
            .get_or_insert_with(ProxyStream::new)
            .stream()
    }

    fn dispose(&self) {
        self.disposed.set(true);
        if let Some(real) = self.target() {
            real.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get() || self.target().is_some_and(|real| real.is_disposed())
    }
}
