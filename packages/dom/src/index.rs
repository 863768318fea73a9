//! Selector query index.
//!
//! Keeps, for every selector the application has asked about, the set of
//! nodes in the container that currently match it. The driver refreshes the
//! index after every patch pass; event streams follow the matched set,
//! listening on new matches and releasing nodes that stopped matching.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use cycle_stream::{Stream, Subject, Subscription};
use tracing::trace;

use crate::document::{DomEvent, ListenerId, Node};
use crate::error::DomError;
use crate::response::{Selection, SelectionSource};
use crate::selector::Selector;

/// Listeners for one `(event type, capture)` pair of a registration.
struct EventBinding {
    event_type: String,
    capture: bool,
    events: Subject<DomEvent>,
    subscribers: Cell<usize>,
    listeners: RefCell<Vec<(Node, ListenerId)>>,
}

impl EventBinding {
    fn new(event_type: &str, capture: bool) -> Self {
        Self {
            event_type: event_type.to_string(),
            capture,
            events: Subject::new(),
            subscribers: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Listen on exactly `nodes`, keeping listeners that are already there.
    fn retarget(&self, nodes: &[Node]) {
        let mut listeners = self.listeners.borrow_mut();
        listeners.retain(|(node, id)| {
            let keep = nodes.contains(node);
            if !keep {
                node.remove_event_listener(*id);
            }
            keep
        });
        for node in nodes {
            if listeners.iter().any(|(n, _)| n == node) {
                continue;
            }
            let events = self.events.clone();
            match node.add_event_listener(&self.event_type, self.capture, move |event| {
                events.next(event.clone())
            }) {
                Ok(id) => listeners.push((node.clone(), id)),
                Err(e) => trace!(error = %e, "skipping listener on removed node"),
            }
        }
        trace!(
            event_type = %self.event_type,
            listeners = listeners.len(),
            "event binding attached"
        );
    }

    fn detach(&self) {
        for (node, id) in self.listeners.borrow_mut().drain(..) {
            node.remove_event_listener(id);
        }
        trace!(event_type = %self.event_type, "event binding detached");
    }
}

/// State behind one selector.
struct Registration {
    selector: Selector,
    matched: RefCell<Vec<Node>>,
    elements: Subject<Node>,
    bindings: RefCell<BTreeMap<(String, bool), Rc<EventBinding>>>,
    disposed: Cell<bool>,
}

impl Registration {
    /// Recompute the matched set under `container`. Returns the new set.
    fn refresh(&self, container: &Node) -> Vec<Node> {
        let mut matched = Vec::new();
        if self.selector.targets_root() && self.selector.matches(container, container) {
            matched.push(container.clone());
        }
        matched.extend(
            container
                .descendants()
                .into_iter()
                .filter(|node| self.selector.matches(node, container)),
        );

        let active: Vec<Rc<EventBinding>> = self
            .bindings
            .borrow()
            .values()
            .filter(|b| b.subscribers.get() > 0)
            .cloned()
            .collect();
        for binding in active {
            binding.retarget(&matched);
        }

        *self.matched.borrow_mut() = matched.clone();
        matched
    }

    fn dispose(&self) {
        self.disposed.set(true);
        let bindings: Vec<Rc<EventBinding>> =
            std::mem::take(&mut *self.bindings.borrow_mut()).into_values().collect();
        for binding in bindings {
            binding.detach();
            binding.events.complete();
        }
        self.matched.borrow_mut().clear();
        self.elements.complete();
    }
}

/// Selection handle backed by a live registration.
struct LiveSelection {
    registration: Rc<Registration>,
}

impl SelectionSource for LiveSelection {
    fn events(&self, event_type: &str, use_capture: bool) -> Stream<DomEvent> {
        let registration = Rc::clone(&self.registration);
        let key = (event_type.to_string(), use_capture);
        if registration.disposed.get() {
            return Stream::empty();
        }
        let binding = Rc::clone(
            registration
                .bindings
                .borrow_mut()
                .entry(key)
                .or_insert_with(|| Rc::new(EventBinding::new(event_type, use_capture))),
        );

        Stream::create(move |observer| {
            let inner = binding
                .events
                .stream()
                .subscribe(move |notification| observer.notify(notification));
            if registration.disposed.get() {
                return inner;
            }

            let count = binding.subscribers.get() + 1;
            binding.subscribers.set(count);
            if count == 1 {
                let matched = registration.matched.borrow().clone();
                binding.retarget(&matched);
            }

            let binding = Rc::clone(&binding);
            Subscription::new(move || {
                drop(inner);
                let count = binding.subscribers.get().saturating_sub(1);
                binding.subscribers.set(count);
                if count == 0 {
                    binding.detach();
                }
            })
        })
    }

    fn observable(&self) -> Stream<Node> {
        let registration = Rc::clone(&self.registration);
        Stream::create(move |observer| {
            let current = registration.matched.borrow().clone();
            for node in current {
                observer.next(node);
            }
            registration
                .elements
                .stream()
                .subscribe(move |notification| observer.notify(notification))
        })
    }
}

/// All selector registrations of one driver.
pub(crate) struct SelectorIndex {
    container: Node,
    mounted: Cell<bool>,
    registrations: RefCell<BTreeMap<String, Rc<Registration>>>,
}

impl SelectorIndex {
    pub(crate) fn new(container: Node) -> Self {
        Self {
            container,
            mounted: Cell::new(false),
            registrations: RefCell::new(BTreeMap::new()),
        }
    }

    /// Get or create the registration for `selector`.
    ///
    /// Before the first patch the registration lies dormant with an empty
    /// matched set.
    pub(crate) fn select(&self, selector: &str) -> Result<Selection, DomError> {
        let parsed = Selector::parse(selector)?;
        let key = parsed.as_str().to_string();

        let existing = self.registrations.borrow().get(&key).cloned();
        let registration = match existing {
            Some(registration) => registration,
            None => {
                trace!(selector = %key, "registering selector");
                let registration = Rc::new(Registration {
                    selector: parsed,
                    matched: RefCell::new(Vec::new()),
                    elements: Subject::new(),
                    bindings: RefCell::new(BTreeMap::new()),
                    disposed: Cell::new(false),
                });
                if self.mounted.get() {
                    registration.refresh(&self.container);
                }
                self.registrations
                    .borrow_mut()
                    .insert(key.clone(), Rc::clone(&registration));
                registration
            }
        };

        Ok(Selection::new(key, Rc::new(LiveSelection { registration })))
    }

    /// Re-run every selector after a patch pass and emit the matched
    /// elements.
    pub(crate) fn refresh(&self) {
        self.mounted.set(true);
        let registrations: Vec<Rc<Registration>> =
            self.registrations.borrow().values().cloned().collect();

        let mut emissions = Vec::with_capacity(registrations.len());
        for registration in &registrations {
            let matched = registration.refresh(&self.container);
            emissions.push((registration.elements.clone(), matched));
        }
        // Emit only after every set is current; subscribers may push a new
        // tree straight back into the driver.
        for (elements, matched) in emissions {
            for node in matched {
                elements.next(node);
            }
        }
    }

    /// Detach every listener and complete every stream.
    pub(crate) fn dispose(&self) {
        let registrations = std::mem::take(&mut *self.registrations.borrow_mut());
        for registration in registrations.into_values() {
            registration.dispose();
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.registrations.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Phase};

    fn setup() -> (Document, Node, SelectorIndex) {
        let document = Document::new();
        let container = document.create_element("div");
        document.body().append_child(&container).unwrap();
        let index = SelectorIndex::new(container.clone());
        (document, container, index)
    }

    fn add(parent: &Node, tag: &str, class: &str) -> Node {
        let node = parent.document().create_element(tag);
        node.set_attribute("class", class).unwrap();
        parent.append_child(&node).unwrap();
        node
    }

    fn count_events(stream: &Stream<DomEvent>) -> (Rc<Cell<usize>>, Subscription) {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let sub = stream.subscribe_next(move |_| c.set(c.get() + 1));
        (count, sub)
    }

    #[test]
    fn dormant_until_refresh() {
        let (_, container, index) = setup();
        let clicks = index.select(".foo").unwrap().events("click");
        let (count, _sub) = count_events(&clicks);

        let foo = add(&container, "button", "foo");
        foo.click();
        assert_eq!(count.get(), 0);

        index.refresh();
        foo.click();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn follows_matched_set() {
        let (document, container, index) = setup();
        let a = add(&container, "li", "item");
        index.refresh();
        let (count, _sub) = count_events(&index.select(".item").unwrap().events("click"));

        let b = add(&container, "li", "item");
        index.refresh();
        a.remove_attribute("class").unwrap();
        index.refresh();

        a.click();
        b.click();
        assert_eq!(count.get(), 1);
        assert_eq!(document.listener_count(), 1);
    }

    #[test]
    fn listeners_detach_with_last_subscriber() {
        let (document, container, index) = setup();
        add(&container, "li", "item");
        index.refresh();
        let clicks = index.select(".item").unwrap().events("click");

        let (_, first) = count_events(&clicks);
        let (_, second) = count_events(&clicks);
        assert_eq!(document.listener_count(), 1);
        drop(first);
        assert_eq!(document.listener_count(), 1);
        drop(second);
        assert_eq!(document.listener_count(), 0);
    }

    #[test]
    fn same_selector_shares_registration() {
        let (_, _, index) = setup();
        index.select(".a").unwrap();
        index.select(" .a ").unwrap();
        index.select(".b").unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn root_matches_container() {
        let (_, container, index) = setup();
        let child = add(&container, "span", "x");
        index.refresh();
        let (count, _sub) = count_events(&index.select(":root").unwrap().events("click"));
        child.click();
        container.click();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn bubbling_delivers_in_dispatch_order() {
        let (_, container, index) = setup();
        let outer = add(&container, "div", "box");
        let inner = add(&outer, "div", "box");
        index.refresh();

        let targets = Rc::new(RefCell::new(Vec::new()));
        let t = Rc::clone(&targets);
        let _sub = index
            .select(".box")
            .unwrap()
            .events("click")
            .subscribe_next(move |e| t.borrow_mut().push(e.current_target().clone()));
        inner.click();
        assert_eq!(*targets.borrow(), vec![inner, outer]);
    }

    #[test]
    fn capture_delivers_before_the_target() {
        let (_, container, index) = setup();
        let outer = add(&container, "div", "box");
        let inner = add(&outer, "button", "item");
        index.refresh();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _item = index
            .select(".item")
            .unwrap()
            .events("click")
            .subscribe_next(move |e| s.borrow_mut().push((e.current_target().clone(), e.phase())));
        let s = Rc::clone(&seen);
        let _box = index
            .select(".box")
            .unwrap()
            .events_with_capture("click", true)
            .subscribe_next(move |e| s.borrow_mut().push((e.current_target().clone(), e.phase())));

        inner.click();
        assert_eq!(
            *seen.borrow(),
            vec![(outer.clone(), Phase::Capturing), (inner.clone(), Phase::AtTarget)]
        );

        // On its own node a capture listener runs in the target phase.
        seen.borrow_mut().clear();
        outer.click();
        assert_eq!(*seen.borrow(), vec![(outer, Phase::AtTarget)]);
    }

    #[test]
    fn observable_replays_current_then_follows() {
        let (_, container, index) = setup();
        let first = add(&container, "p", "note");
        index.refresh();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = index
            .select(".note")
            .unwrap()
            .observable()
            .subscribe_next(move |n| s.borrow_mut().push(n));
        let second = add(&container, "p", "note");
        index.refresh();

        assert_eq!(*seen.borrow(), vec![first.clone(), first, second]);
    }

    #[test]
    fn dispose_completes_and_detaches() {
        let (document, container, index) = setup();
        add(&container, "li", "item");
        index.refresh();
        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        let _sub = index.select(".item").unwrap().events("click").subscribe(move |n| {
            if n.is_terminal() {
                d.set(true);
            }
        });
        assert_eq!(document.listener_count(), 1);

        index.dispose();
        assert!(done.get());
        assert_eq!(document.listener_count(), 0);
    }
}
