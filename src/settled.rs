//! Immutable terminal wrappers: a fulfillment or rejection fixed at
//! construction time. A settled [`Promise`](crate::Promise) converts itself
//! into one of these to dispatch late-registered reactions, and producers use
//! them as already-resolved shortcuts.

use std::rc::Rc;

use crate::error::PromiseError;
use crate::promise::{settle_downstream, Promise};
use crate::scheduler::Scheduler;
use crate::state::State;
use crate::value::{Handler, Thenable, Value};

/// An already-fulfilled promise holding a fixed value.
///
/// Write-once at construction: [`resolve`](FulfilledPromise::resolve) only
/// accepts a re-assertion of the recorded value, and
/// [`reject`](FulfilledPromise::reject) always fails.
///
/// # Example
/// ```
/// # use pledge::{FulfilledPromise, TaskQueue, Value};
/// # use std::rc::Rc;
/// let queue = Rc::new(TaskQueue::new());
/// let p = FulfilledPromise::new(Value::from(3), queue).unwrap();
/// let q = p
///     .then(
///         Some(Box::new(|v: Value| match v {
///             Value::Int(n) => Ok(Value::Int(n + 1)),
///             other => Ok(other),
///         })),
///         None,
///     );
/// assert_eq!(q.wait().unwrap(), Value::from(4));
/// ```
#[derive(Clone)]
pub struct FulfilledPromise {
    value: Value,
    scheduler: Rc<dyn Scheduler>,
}

impl FulfilledPromise {
    /// Wrap a fulfillment value.
    ///
    /// # Errors
    /// [`PromiseError::InvalidArgument`] when `value` is a thenable: a
    /// settled shortcut must not wrap an unresolved computation.
    pub fn new(value: Value, scheduler: Rc<dyn Scheduler>) -> Result<Self, PromiseError> {
        if value.is_thenable() {
            return Err(PromiseError::InvalidArgument);
        }
        Ok(FulfilledPromise { value, scheduler })
    }

    /// Register a fulfillment handler.
    ///
    /// With no handler this hands back a value-equivalent fulfilled promise.
    /// With one, a fresh pending promise is returned and a task is enqueued
    /// (and the scheduler drained) that runs the handler against the recorded
    /// value and settles the promise with its outcome, a handler failure
    /// becoming the rejection reason. The rejection slot is ignored; this
    /// promise cannot reject.
    pub fn then(&self, on_fulfilled: Option<Handler>, _on_rejected: Option<Handler>) -> Promise {
        let Some(handler) = on_fulfilled else {
            return Promise::settled(State::Fulfilled, self.value.clone(), self.scheduler.clone());
        };

        let downstream = Promise::new(self.scheduler.clone());
        let settled = downstream.clone();
        let value = self.value.clone();
        self.scheduler.enqueue(Box::new(move || {
            if settled.state() == State::Pending {
                settle_downstream(&settled, handler(value));
            }
        }));
        self.scheduler.drain();
        downstream
    }

    /// Re-assert the recorded fulfillment value.
    ///
    /// # Errors
    /// [`PromiseError::LogicViolation`] when `value` differs from the
    /// recorded one; this type is write-once at construction.
    pub fn resolve(&self, value: Value) -> Result<(), PromiseError> {
        if value == self.value {
            Ok(())
        } else {
            Err(PromiseError::LogicViolation(
                "supplied value does not equal the recorded fulfillment value".to_string(),
            ))
        }
    }

    /// Always fails: a fulfilled promise cannot be rejected.
    ///
    /// # Errors
    /// [`PromiseError::LogicViolation`], unconditionally.
    pub fn reject(&self, _reason: Value) -> Result<(), PromiseError> {
        Err(PromiseError::LogicViolation(
            "cannot reject an already-fulfilled promise".to_string(),
        ))
    }

    /// Always [`State::Fulfilled`].
    pub fn state(&self) -> State {
        State::Fulfilled
    }

    /// The recorded fulfillment value.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Thenable for FulfilledPromise {
    fn state(&self) -> State {
        FulfilledPromise::state(self)
    }

    fn then(
        &self,
        on_fulfilled: Option<Handler>,
        on_rejected: Option<Handler>,
    ) -> Result<Promise, PromiseError> {
        Ok(FulfilledPromise::then(self, on_fulfilled, on_rejected))
    }
}

/// An already-rejected promise holding a fixed reason.
///
/// The mirror image of [`FulfilledPromise`]: only the rejection slot of
/// [`then`](RejectedPromise::then) is honored, and the settle operations are
/// write-once guards.
#[derive(Clone)]
pub struct RejectedPromise {
    reason: Value,
    scheduler: Rc<dyn Scheduler>,
}

impl RejectedPromise {
    /// Wrap a rejection reason.
    ///
    /// # Errors
    /// [`PromiseError::InvalidArgument`] when `reason` is a thenable.
    pub fn new(reason: Value, scheduler: Rc<dyn Scheduler>) -> Result<Self, PromiseError> {
        if reason.is_thenable() {
            return Err(PromiseError::InvalidArgument);
        }
        Ok(RejectedPromise { reason, scheduler })
    }

    /// Register a rejection handler.
    ///
    /// With no handler this hands back a reason-equivalent rejected promise.
    /// With one, the handler runs through the scheduler against the recorded
    /// reason and its outcome settles the returned promise; note that a
    /// successful handler *resolves* it, which is how recovery from
    /// rejection works. The fulfillment slot is ignored; this promise cannot
    /// fulfill.
    pub fn then(&self, _on_fulfilled: Option<Handler>, on_rejected: Option<Handler>) -> Promise {
        let Some(handler) = on_rejected else {
            return Promise::settled(State::Rejected, self.reason.clone(), self.scheduler.clone());
        };

        let downstream = Promise::new(self.scheduler.clone());
        let settled = downstream.clone();
        let reason = self.reason.clone();
        self.scheduler.enqueue(Box::new(move || {
            if settled.state() == State::Pending {
                settle_downstream(&settled, handler(reason));
            }
        }));
        self.scheduler.drain();
        downstream
    }

    /// Always fails: a rejected promise cannot be fulfilled.
    ///
    /// # Errors
    /// [`PromiseError::LogicViolation`], unconditionally.
    pub fn resolve(&self, _value: Value) -> Result<(), PromiseError> {
        Err(PromiseError::LogicViolation(
            "cannot resolve an already-rejected promise".to_string(),
        ))
    }

    /// Re-assert the recorded rejection reason.
    ///
    /// # Errors
    /// [`PromiseError::LogicViolation`] when `reason` differs from the
    /// recorded one.
    pub fn reject(&self, reason: Value) -> Result<(), PromiseError> {
        if reason == self.reason {
            Ok(())
        } else {
            Err(PromiseError::LogicViolation(
                "supplied reason does not equal the recorded rejection reason".to_string(),
            ))
        }
    }

    /// Always [`State::Rejected`].
    pub fn state(&self) -> State {
        State::Rejected
    }

    /// The recorded rejection reason.
    pub fn reason(&self) -> &Value {
        &self.reason
    }
}

impl Thenable for RejectedPromise {
    fn state(&self) -> State {
        RejectedPromise::state(self)
    }

    fn then(
        &self,
        on_fulfilled: Option<Handler>,
        on_rejected: Option<Handler>,
    ) -> Result<Promise, PromiseError> {
        Ok(RejectedPromise::then(self, on_fulfilled, on_rejected))
    }
}
