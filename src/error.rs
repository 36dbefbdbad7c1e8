use thiserror::Error;

use crate::state::State;
use crate::value::Value;

/// Everything that can go wrong when driving a promise.
///
/// The variants fall into two camps. Contract violations
/// ([`StateConflict`](PromiseError::StateConflict),
/// [`SelfSettlement`](PromiseError::SelfSettlement),
/// [`InvalidArgument`](PromiseError::InvalidArgument),
/// [`LogicViolation`](PromiseError::LogicViolation)) indicate misuse of the
/// API by the caller and are never produced by an ordinary asynchronous
/// failure. The remaining variants surface normal rejection outcomes to a
/// synchronous caller: a reaction handler that fails does *not* produce a
/// `PromiseError` at all — its error value becomes the rejection reason of
/// the downstream promise.
#[derive(Debug, Error)]
pub enum PromiseError {
    /// The promise is already settled and the new settlement does not match
    /// the recorded one. Re-settling with the identical state and value is a
    /// silent no-op instead.
    #[error("promise is already {actual}, cannot settle it as {requested} with a different value")]
    StateConflict {
        /// State the promise is already in.
        actual: State,
        /// State the offending call asked for.
        requested: State,
    },

    /// A promise was given itself as its own fulfillment value or rejection
    /// reason.
    #[error("unable to fulfill or reject a promise with itself")]
    SelfSettlement,

    /// A settled wrapper ([`FulfilledPromise`](crate::FulfilledPromise) or
    /// [`RejectedPromise`](crate::RejectedPromise)) was constructed over a
    /// thenable value. A settled shortcut must not wrap an unresolved
    /// computation.
    #[error("a settled promise wrapper cannot hold a thenable value")]
    InvalidArgument,

    /// A write-once guard tripped: the wrong settle operation was invoked on
    /// a settled wrapper, or the right one with a mismatched value.
    #[error("{0}")]
    LogicViolation(String),

    /// [`wait`](crate::Promise::wait) ran to completion and the promise ended
    /// up rejected; the payload is the rejection reason.
    #[error("promise was rejected: {0}")]
    Rejected(Value),

    /// The wait callback failed after the promise had already settled, so the
    /// failure could not be folded into the promise and is surfaced to the
    /// caller of [`wait`](crate::Promise::wait) instead.
    #[error("wait callback failed: {0}")]
    WaitCallback(Value),
}
