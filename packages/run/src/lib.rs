//! Circular runtime
//!
//! Connects a pure application function (`main`) to effectful drivers:
//! - `Driver`: adapter consuming a request stream and producing a response
//! - `Response`: how a driver's response stands in for itself before the
//!   driver has started
//! - `Drivers` / `Requests` / `Responses`: the named collections passed
//!   around
//! - `run`: wires it all together and returns a disposable `Runtime`
//!
//! `main` reads its inputs from the responses and returns its outputs as
//! requests. Responses depend on requests and requests depend on responses;
//! `run` breaks the cycle by handing `main` placeholders that are bound to
//! the real responses once every driver has started.
//!
//! # Example
//!
//! ```rust
//! use cycle_run::{driver_fn, run, Drivers, Requests, RunError};
//! use cycle_stream::Stream;
//!
//! let drivers = Drivers::new().with(
//!     "echo",
//!     driver_fn(|requests: Stream<String>| -> Result<Stream<String>, RunError> {
//!         Ok(requests)
//!     }),
//! );
//!
//! let runtime = run(
//!     |_responses| Ok(Requests::new().with("echo", Stream::of(["hi".to_string()]))),
//!     drivers,
//! )?;
//! assert_eq!(runtime.requests().len(), 1);
//! # Ok::<(), RunError>(())
//! ```

mod collections;
mod driver;
mod error;
mod runtime;

pub use collections::{Drivers, Requests, Responses};
pub use driver::{driver_fn, Driver, FnDriver, Response, Sink};
pub use error::{Result, RunError};
pub use runtime::{run, Runtime};
