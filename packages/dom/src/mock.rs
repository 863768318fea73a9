//! A canned [`DomResponse`] for testing `main` functions without a document.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use cycle_stream::Stream;

use crate::document::{DomEvent, Node};
use crate::error::DomError;
use crate::response::{DomResponse, Query, Selection, SelectionSource};

/// Build a response whose `select(selector).events(event_type)` returns the
/// given stream.
///
/// Selectors and event types not in `mapping` give a stream that completes
/// at once. Selectors are not validated; they are looked up verbatim. Once
/// disposed, `select` fails with [`DomError::DriverDisposed`] like a live
/// response does.
///
/// # Example
///
/// ```rust
/// use cycle_dom::{mock_dom_response, Document, DomEvent};
/// use cycle_stream::Stream;
///
/// let document = Document::new();
/// let click = DomEvent::new("click", document.body());
/// let dom = mock_dom_response([(".ok", [("click", Stream::of([click]))])]);
///
/// let clicks = dom.select(".ok").unwrap().events("click").collect_sync().unwrap();
/// assert_eq!(clicks.len(), 1);
/// assert!(dom.select(".other").unwrap().events("click").collect_sync().unwrap().is_empty());
/// ```
pub fn mock_dom_response<S, E, T>(mapping: impl IntoIterator<Item = (S, E)>) -> DomResponse
where
    S: Into<String>,
    E: IntoIterator<Item = (T, Stream<DomEvent>)>,
    T: Into<String>,
{
    let selectors = mapping
        .into_iter()
        .map(|(selector, events)| {
            let events = events
                .into_iter()
                .map(|(event_type, stream)| (event_type.into(), stream))
                .collect();
            (selector.into(), Rc::new(MockSelection { events }))
        })
        .collect();
    DomResponse::new(Rc::new(MockQuery {
        selectors,
        disposed: Cell::new(false),
    }))
}

struct MockQuery {
    selectors: BTreeMap<String, Rc<MockSelection>>,
    disposed: Cell<bool>,
}

#[derive(Default)]
struct MockSelection {
    events: BTreeMap<String, Stream<DomEvent>>,
}

impl Query for MockQuery {
    fn select(&self, selector: &str) -> Result<Selection, DomError> {
        if self.disposed.get() {
            return Err(DomError::DriverDisposed);
        }
        let source: Rc<dyn SelectionSource> = match self.selectors.get(selector) {
            Some(selection) => Rc::clone(selection) as Rc<dyn SelectionSource>,
            None => Rc::new(MockSelection::default()),
        };
        Ok(Selection::new(selector.to_string(), source))
    }

    fn diagnostics(&self) -> Stream<DomError> {
        Stream::empty()
    }

    fn dispose(&self) {
        self.disposed.set(true);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

impl SelectionSource for MockSelection {
    fn events(&self, event_type: &str, _use_capture: bool) -> Stream<DomEvent> {
        self.events
            .get(event_type)
            .cloned()
            .unwrap_or_else(Stream::empty)
    }

    fn observable(&self) -> Stream<Node> {
        Stream::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use cycle_stream::Subject;

    #[test]
    fn mapped_streams_are_returned() {
        let document = Document::new();
        let clicks = Subject::new();
        let dom = mock_dom_response([("#go", [("click", clicks.stream())])]);

        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let _sub = dom
            .select("#go")
            .unwrap()
            .events("click")
            .subscribe_next(move |_| s.set(s.get() + 1));
        clicks.next(DomEvent::new("click", document.body()));
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn unknown_entries_complete_immediately() {
        let dom = mock_dom_response([("#go", [("click", Stream::never())])]);
        let selection = dom.select("#go").unwrap();
        assert!(selection.events("input").collect_sync().unwrap().is_empty());
        assert!(dom.select("nope").unwrap().events("click").collect_sync().unwrap().is_empty());
        assert!(selection.observable().collect_sync().unwrap().is_empty());
    }

    #[test]
    fn selectors_are_not_validated() {
        let dom = mock_dom_response(Vec::<(&str, Vec<(&str, Stream<DomEvent>)>)>::new());
        assert!(dom.select("[[[").is_ok());
    }

    #[test]
    fn dispose_is_recorded() {
        let dom = mock_dom_response(Vec::<(&str, Vec<(&str, Stream<DomEvent>)>)>::new());
        assert!(!dom.is_disposed());
        let before = dom.select(".kept").unwrap();
        dom.dispose();
        assert!(dom.is_disposed());
        assert_eq!(dom.select(".kept").unwrap_err(), DomError::DriverDisposed);
        assert_eq!(before.selector(), ".kept");
    }
}
