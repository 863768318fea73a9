//! cycle: circular dataflow applications.
//!
//! An application is a pure function from driver responses to driver
//! requests. [`run`] wires it to a set of drivers, closing the loop so that
//! what the application asks for feeds back into what it observes.
//!
//! The layers live in their own crates and are re-exported here:
//! - [`stream`]: push-based streams, subjects, proxies, pair joins
//! - [`vtree`]: virtual trees, the `h` builder, structural diff
//! - [`run`](mod@run): the runtime and the driver contract
//! - [`dom`]: the DOM driver and its in-memory document
//!
//! # Example
//!
//! ```rust
//! use cycle::{attrs, h, run, text, Document, DomDriver, DomResponse, Drivers, Requests};
//!
//! let document = Document::new();
//! let app = document.create_element("div");
//! document.body().append_child(&app).unwrap();
//!
//! let runtime = run(
//!     |responses| {
//!         let dom = responses.get::<DomResponse>("DOM")?;
//!         let view = dom
//!             .select("button")?
//!             .events("click")
//!             .scan(0, |count, _| count + 1)
//!             .start_with(0)
//!             .map(|count| h("button", attrs! {}, vec![text(format!("clicked {count}"))]));
//!         Ok(Requests::new().with("DOM", view))
//!     },
//!     Drivers::new().with("DOM", DomDriver::new(app.clone())),
//! )
//! .unwrap();
//!
//! let button = app.query_selector("button").unwrap().unwrap();
//! button.click();
//! assert_eq!(button.text_content(), "clicked 1");
//! drop(runtime);
//! ```

pub use cycle_dom as dom;
pub use cycle_run as run;
pub use cycle_stream as stream;
pub use cycle_vtree as vtree;

pub use cycle_dom::{mock_dom_response, CustomElements, Document, DomDriver, DomEvent, DomResponse, Node, Props};
pub use cycle_run::{
    driver_fn, run, Driver, Drivers, Requests, Responses, RunError, Runtime, Sink,
};
pub use cycle_stream::{when_pair_then_do, Stream, Subject, Subscription};
pub use cycle_vtree::{attrs, h, text, VNode};
