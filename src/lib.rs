//!
//! # Pledge — deferred values with exactly-once settlement
//!
//! This crate provides a JavaScript-inspired Promise state machine for Rust:
//! producers settle an asynchronous result exactly once, consumers attach
//! reaction handlers that run later in registration order, and settling with
//! another promise-like value adopts that value's eventual outcome.
//!
//! ## Features
//! - Exactly-once settlement with typed contract violations (`Result`, not panics)
//! - Chaining with [`then`](Promise::then), including identity passthrough for
//!   missing handler slots
//! - Adoption of nested promises and foreign [`Thenable`] sources
//! - Synchronous draining with [`wait`](Promise::wait) and cooperative
//!   cancellation with [`cancel`](Promise::cancel)
//! - An explicit, swappable [`Scheduler`] — no global task queue
//!
//! ## Example
//! ```
//! use pledge::{Deferred, Promisor, TaskQueue, Value};
//! use std::rc::Rc;
//!
//! let queue = Rc::new(TaskQueue::new());
//! let deferred = Deferred::new(queue);
//!
//! let upper = deferred
//!     .promise()
//!     .then(
//!         Some(Box::new(|v: Value| match v {
//!             Value::Str(s) => Ok(Value::Str(s.to_uppercase())),
//!             other => Ok(other),
//!         })),
//!         None,
//!     )
//!     .unwrap();
//!
//! deferred.resolve(Value::from("hi")).unwrap();
//! assert_eq!(upper.wait().unwrap(), Value::from("HI"));
//! ```
//!
//! ## Error Handling
//! Misusing the API (conflicting re-settlement, settling a promise with
//! itself, writing to a settled wrapper) is reported as a distinguishable
//! [`PromiseError`] variant. Ordinary asynchronous failure never takes that
//! route: a handler that fails rejects the downstream promise with its error
//! [`Value`] as the reason, and [`wait`](Promise::wait) surfaces such a
//! rejection as [`PromiseError::Rejected`].
//!
//! ## Scheduling
//! The model is single-threaded and cooperative. Reaction handlers are never
//! invoked inline by the `then` call that registered them; they go through
//! the [`Scheduler`] the promise was constructed with, and settlement drains
//! that scheduler to emptiness. [`TaskQueue`] is the reference FIFO
//! implementation; anything implementing [`Scheduler`] works.
//!
//! ## See Also
//! - [`Promise`] for the core state machine
//! - [`FulfilledPromise`] / [`RejectedPromise`] for settled shortcuts
//! - [`Deferred`] for separating settlement authority from observation
//!
//! ---
//!
//! Released under the MIT License.

#![warn(missing_docs)]


mod deferred;
mod error;
mod promise;
mod scheduler;
mod settled;
mod state;
mod value;

pub use deferred::{Deferred, Promisor};
pub use error::PromiseError;
pub use promise::Promise;
pub use scheduler::{Scheduler, Task, TaskQueue};
pub use settled::{FulfilledPromise, RejectedPromise};
pub use state::State;
pub use value::{Handler, Thenable, Value};
