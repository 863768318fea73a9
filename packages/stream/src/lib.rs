//! Push-based reactive streams
//!
//! The stream layer everything else in cycle is wired with:
//! - `Stream`: a cold, push-based recipe with `map`, `filter`, `scan`,
//!   `start_with` and `merge`
//! - `Subject`: a hot multicast source you push into by hand
//! - `ProxyStream`: a stream that can be subscribed before its source exists,
//!   bound exactly once later (the basis of circular wiring)
//! - `when_pair_then_do`: pairwise join of two streams
//!
//! Everything is single-threaded and synchronous. A value pushed into a
//! source is delivered through the whole chain before `next` returns, and a
//! value that loops back into an observer still busy with the previous one
//! waits its turn.
//!
//! # Example
//!
//! ```rust
//! use cycle_stream::Stream;
//!
//! let counts = Stream::of([1, 1, 1])
//!     .scan(0, |count, step| count + step)
//!     .start_with(0);
//! assert_eq!(counts.collect_sync().unwrap(), vec![0, 1, 2, 3]);
//! ```

mod error;
mod observer;
mod proxy;
mod stream;
mod subject;
mod subscription;
mod when;

pub use error::{BindError, StreamError};
pub use observer::{Notification, Observer};
pub use proxy::ProxyStream;
pub use stream::Stream;
pub use subject::Subject;
pub use subscription::Subscription;
pub use when::{when_pair_then_do, Pattern};
