//! The DOM driver: renders a stream of trees into a container element.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::{Rc, Weak};

use cycle_run::{Driver, Requests, Responses, Result as RunResult};
use cycle_stream::{Notification, Stream, Subject, Subscription};
use cycle_vtree::{diff, NodePath, VNode};
use tracing::{debug, error, trace, warn};

use crate::custom::{mask, CustomElements, Host, Instance};
use crate::document::{Document, Node};
use crate::error::DomError;
use crate::index::SelectorIndex;
use crate::render;
use crate::response::{DomResponse, Query, Selection};

#[derive(Clone)]
enum Container {
    Node(Node),
    Selector { document: Document, selector: String },
}

/// Renders `VNode` requests into a container and answers `select` queries
/// about what it rendered.
///
/// The first tree replaces the container's content; every later tree is
/// diffed against the previous one and only the differences are applied.
///
/// # Example
///
/// ```rust
/// use cycle_dom::{Document, DomDriver, DomResponse};
/// use cycle_run::{run, Drivers, Requests};
/// use cycle_stream::Stream;
/// use cycle_vtree::{attrs, h, text};
///
/// let document = Document::new();
/// let app = document.create_element("div");
/// app.set_attribute("id", "app").unwrap();
/// document.body().append_child(&app).unwrap();
///
/// let drivers = Drivers::new().with("DOM", DomDriver::from_selector(&document, "#app"));
/// let runtime = run(|_responses| {
///     let view = Stream::of([h("h1", attrs! {}, vec![text("hello")])]);
///     Ok(Requests::new().with("DOM", view))
/// }, drivers).unwrap();
///
/// assert_eq!(app.inner_html(), "<h1>hello</h1>");
/// drop(runtime);
/// ```
#[derive(Clone)]
pub struct DomDriver {
    container: Container,
    custom: CustomElements,
}

impl fmt::Debug for DomDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("DomDriver");
        match &self.container {
            Container::Node(node) => s.field("container", node),
            Container::Selector { selector, .. } => s.field("container", selector),
        };
        s.field("custom", &self.custom).finish()
    }
}

impl DomDriver {
    /// Render into `container`.
    pub fn new(container: Node) -> Self {
        Self {
            container: Container::Node(container),
            custom: CustomElements::new(),
        }
    }

    /// Render into the first element of `document` matching `selector`,
    /// looked up when the driver starts.
    pub fn from_selector(document: &Document, selector: &str) -> Self {
        Self {
            container: Container::Selector {
                document: document.clone(),
                selector: selector.to_string(),
            },
            custom: CustomElements::new(),
        }
    }

    /// Render `tag` with `component`. See [`CustomElements`].
    pub fn with_custom_element<F>(mut self, tag: &str, component: F) -> Self
    where
        F: Fn(&Responses) -> RunResult<Requests> + 'static,
    {
        self.custom.insert(tag, component);
        self
    }

    /// Render every tag in `custom` with its component.
    pub fn with_custom_elements(mut self, custom: CustomElements) -> Self {
        self.custom.extend(&custom);
        self
    }

    fn resolve_container(&self) -> Result<Node, DomError> {
        match &self.container {
            Container::Node(node) if node.is_alive() => Ok(node.clone()),
            Container::Node(_) => Err(DomError::DetachedNode),
            Container::Selector { document, selector } => document
                .query_selector(selector)?
                .ok_or_else(|| DomError::ContainerNotFound {
                    selector: selector.clone(),
                }),
        }
    }
}

impl Driver for DomDriver {
    type Request = VNode;
    type Response = DomResponse;

    fn drive(&self, requests: Stream<VNode>) -> RunResult<DomResponse> {
        let container = self.resolve_container()?;
        debug!(container = ?container, "starting DOM driver");

        let live = Rc::new(LiveDom::new(container, self.custom.clone()));
        let weak: Weak<LiveDom> = Rc::downgrade(&live);
        let subscription = requests.subscribe(move |notification| {
            if let Some(live) = weak.upgrade() {
                live.on_request(notification);
            }
        });
        if live.is_disposed() {
            drop(subscription);
        } else {
            *live.requests.borrow_mut() = Some(subscription);
        }
        Ok(DomResponse::new(live))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Uninitialized,
    Mounted,
    Disposed,
}

/// A started driver.
struct LiveDom {
    container: Node,
    custom: CustomElements,
    index: SelectorIndex,
    state: Cell<State>,
    /// The last rendered tree, custom elements masked.
    last: RefCell<Option<VNode>>,
    requests: RefCell<Option<Subscription>>,
    instances: RefCell<BTreeMap<NodePath, Instance>>,
    diagnostics: Subject<DomError>,
    warned: RefCell<BTreeSet<String>>,
}

impl LiveDom {
    fn new(container: Node, custom: CustomElements) -> Self {
        Self {
            index: SelectorIndex::new(container.clone()),
            container,
            custom,
            state: Cell::new(State::Uninitialized),
            last: RefCell::new(None),
            requests: RefCell::new(None),
            instances: RefCell::new(BTreeMap::new()),
            diagnostics: Subject::new(),
            warned: RefCell::new(BTreeSet::new()),
        }
    }

    fn on_request(&self, notification: Notification<VNode>) {
        match notification {
            Notification::Next(tree) => self.render(&tree),
            Notification::Error(e) => {
                warn!(error = %e, "DOM request stream failed");
                self.report(DomError::Stream(e));
            }
            Notification::Complete => trace!("DOM request stream completed"),
        }
    }

    fn report(&self, error: DomError) {
        self.diagnostics.next(error);
    }

    fn render(&self, tree: &VNode) {
        if self.state.get() == State::Disposed {
            return;
        }
        let (masked, hosts) = mask(tree, &self.custom);
        self.check_tags(&masked);

        let previous = self.last.borrow().clone();
        let outcome = match &previous {
            None => render::mount(&self.container, &masked).map(|()| None),
            Some(old) => {
                let patches = diff(old, &masked);
                render::apply_patches(&self.container, &patches).map(|()| Some(patches.len()))
            }
        };
        match outcome {
            Ok(None) => debug!("DOM mounted"),
            Ok(Some(patches)) => debug!(patches, "DOM patched"),
            Err(e) => {
                warn!(error = %e, "patch failed, remounting");
                self.report(e);
                if let Err(e) = render::mount(&self.container, &masked) {
                    error!(error = %e, "remount failed");
                    self.report(e);
                    return;
                }
            }
        }
        *self.last.borrow_mut() = Some(masked);
        self.state.set(State::Mounted);

        self.reconcile(hosts);
        if self.state.get() != State::Disposed {
            self.index.refresh();
        }
    }

    /// Warn once per tag that is neither HTML nor a registered component.
    fn check_tags(&self, tree: &VNode) {
        let unknown: Vec<String> = std::iter::once(tree)
            .chain(tree.descendants())
            .filter_map(VNode::tag)
            .filter(|tag| !render::is_known_tag(tag) && !self.custom.contains(tag))
            .filter(|tag| self.warned.borrow_mut().insert(tag.to_string()))
            .map(str::to_string)
            .collect();
        for tag in unknown {
            warn!(tag = %tag, "unknown element");
            self.report(DomError::UnknownCustomElement { tag });
        }
    }

    /// Keep, update, start and stop custom element instances to match
    /// `hosts`.
    fn reconcile(&self, hosts: Vec<Host>) {
        let mut current = std::mem::take(&mut *self.instances.borrow_mut());
        if hosts.is_empty() && current.is_empty() {
            return;
        }

        let mut kept = BTreeMap::new();
        let mut stale = Vec::new();
        let mut fresh = Vec::new();
        for host in hosts {
            let Some(node) = render::node_at(&self.container, &host.path) else {
                continue;
            };
            match current.remove(&host.path) {
                Some(instance) if instance.serves(&host.tag, &node) => {
                    kept.insert(host.path, (instance, host.props));
                }
                Some(instance) => {
                    stale.push(instance);
                    fresh.push((host, node));
                }
                None => fresh.push((host, node)),
            }
        }
        stale.extend(current.into_values());
        for instance in stale {
            instance.dispose();
        }

        let mut instances = BTreeMap::new();
        for (path, (instance, props)) in kept {
            instance.update(props);
            instances.insert(path, instance);
        }
        for (host, node) in fresh {
            match Instance::start(&self.custom, &host.tag, node, host.props) {
                Some(Ok(instance)) => {
                    instances.insert(host.path, instance);
                }
                Some(Err(e)) => {
                    error!(tag = %host.tag, error = %e, "custom element failed to start");
                    self.report(DomError::Component {
                        tag: host.tag,
                        message: e.to_string(),
                    });
                }
                None => {}
            }
        }
        *self.instances.borrow_mut() = instances;
    }
}

impl Query for LiveDom {
    fn select(&self, selector: &str) -> Result<Selection, DomError> {
        if self.state.get() == State::Disposed {
            return Err(DomError::DriverDisposed);
        }
        self.index.select(selector)
    }

    fn diagnostics(&self) -> Stream<DomError> {
        self.diagnostics.stream()
    }

    fn dispose(&self) {
        if self.state.get() == State::Disposed {
            return;
        }
        self.state.set(State::Disposed);
        debug!("disposing DOM driver");

        let requests = self.requests.borrow_mut().take();
        drop(requests);
        let instances = std::mem::take(&mut *self.instances.borrow_mut());
        for instance in instances.into_values() {
            instance.dispose();
        }
        self.index.dispose();
        self.last.borrow_mut().take();
        self.diagnostics.complete();
    }

    fn is_disposed(&self) -> bool {
        self.state.get() == State::Disposed
    }
}
