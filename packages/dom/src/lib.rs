//! DOM driver for cycle
//!
//! - `Document` and `Node`: a small in-memory document with attributes,
//!   text, listeners and capture/bubble event dispatch
//! - `DomDriver`: renders a stream of `VNode` trees into a container, the
//!   first by mounting and every later one by patching the difference
//! - `DomResponse::select`: event and element streams for a CSS selector,
//!   valid before any matching element exists
//! - custom elements: tags rendered by nested applications
//! - `mock_dom_response`: a canned response for testing `main` alone
//!
//! # Example
//!
//! ```rust
//! use cycle_dom::{Document, DomDriver, DomResponse};
//! use cycle_run::{run, Drivers, Requests};
//! use cycle_vtree::{attrs, h, text};
//!
//! let document = Document::new();
//! let app = document.create_element("div");
//! document.body().append_child(&app).unwrap();
//!
//! let drivers = Drivers::new().with("DOM", DomDriver::new(app.clone()));
//! let runtime = run(|responses| {
//!     let dom = responses.get::<DomResponse>("DOM")?;
//!     let view = dom
//!         .select(".toggle")?
//!         .events("click")
//!         .scan(false, |on, _| !on)
//!         .start_with(false)
//!         .map(|on| h("button.toggle", attrs! {}, vec![text(if on { "on" } else { "off" })]));
//!     Ok(Requests::new().with("DOM", view))
//! }, drivers).unwrap();
//!
//! let button = app.query_selector(".toggle").unwrap().unwrap();
//! assert_eq!(button.text_content(), "off");
//! button.click();
//! assert_eq!(button.text_content(), "on");
//! drop(runtime);
//! ```

mod custom;
mod document;
mod driver;
mod error;
mod index;
mod mock;
mod render;
mod response;
mod selector;

pub use custom::{CustomElements, Props, DOM_DRIVER, PROPS_DRIVER};
pub use document::{Document, DomEvent, ListenerId, Node, NodeId, Phase};
pub use driver::DomDriver;
pub use error::DomError;
pub use mock::mock_dom_response;
pub use response::{DeferredQuery, DomResponse, Selection};
pub use selector::Selector;
