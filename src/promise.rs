use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use log::{debug, trace, warn};

use crate::error::PromiseError;
use crate::scheduler::Scheduler;
use crate::settled::{FulfilledPromise, RejectedPromise};
use crate::state::State;
use crate::value::{Handler, Thenable, Value};

/// The shape of the wait and cancel driver callbacks: invoked once, with an
/// `Err` payload standing in for a thrown error.
type SettleFn = Box<dyn FnOnce() -> Result<(), Value>>;

const WAIT_UNRESOLVED: &str =
    "invoking the synchronous wait callback resolver did not resolve the promise";

const CANCELLED: &str = "promise has been cancelled";

/// A registered reaction awaiting dispatch: the downstream promise created by
/// `then` plus the optional handler for each settlement direction.
struct Reaction {
    downstream: Promise,
    on_fulfilled: Option<Handler>,
    on_rejected: Option<Handler>,
}

struct Inner {
    state: State,
    current: Option<Value>,
    reactions: Vec<Reaction>,
    wait_callback: Option<SettleFn>,
    cancel_callback: Option<SettleFn>,
}

/// A handle to an asynchronous result that settles exactly once.
///
/// A `Promise` starts out [`Pending`](State::Pending), accumulates reactions
/// registered through [`then`](Promise::then), and settles at most once via
/// [`resolve`](Promise::resolve) or [`reject`](Promise::reject). Settlement
/// hands the accumulated reactions to the [`Scheduler`] the promise was
/// constructed with; handlers never run inline with the `then` call that
/// registered them.
///
/// Cloning a `Promise` clones the handle, not the state: every clone observes
/// and drives the same settlement.
///
/// # Example
/// ```
/// use pledge::{Promise, TaskQueue, Value};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let queue = Rc::new(TaskQueue::new());
/// let p = Promise::new(queue.clone());
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let log = seen.clone();
/// p.then(
///     Some(Box::new(move |v: Value| {
///         log.borrow_mut().push(v.clone());
///         Ok(v)
///     })),
///     None,
/// )
/// .unwrap();
///
/// assert!(seen.borrow().is_empty());
/// p.resolve(Value::from("hi")).unwrap();
/// assert_eq!(seen.borrow().as_slice(), &[Value::from("hi")]);
/// ```
#[derive(Clone)]
pub struct Promise {
    inner: Rc<RefCell<Inner>>,
    scheduler: Rc<dyn Scheduler>,
}

impl Promise {
    /// Create a pending promise driven by the given scheduler.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Promise {
            inner: Rc::new(RefCell::new(Inner {
                state: State::Pending,
                current: None,
                reactions: Vec::new(),
                wait_callback: None,
                cancel_callback: None,
            })),
            scheduler,
        }
    }

    /// Construct an already-settled promise without running propagation.
    /// Used where a settled wrapper hands back "itself" as a core promise.
    pub(crate) fn settled(state: State, value: Value, scheduler: Rc<dyn Scheduler>) -> Self {
        Promise {
            inner: Rc::new(RefCell::new(Inner {
                state,
                current: Some(value),
                reactions: Vec::new(),
                wait_callback: None,
                cancel_callback: None,
            })),
            scheduler,
        }
    }

    /// Current settlement state.
    pub fn state(&self) -> State {
        self.inner.borrow().state
    }

    /// Whether two handles refer to the same underlying promise.
    ///
    /// This is the identity used by the self-settlement rule and by
    /// [`Value`] equality for the [`Value::Promise`] variant.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Append fulfillment and rejection handlers, returning the downstream
    /// promise that will settle with the chosen handler's outcome.
    ///
    /// On a pending promise this registers a reaction and returns
    /// immediately; no handler runs before the registering statement
    /// completes. On a settled promise the call routes through the matching
    /// settled wrapper, so the handler still executes through the scheduler
    /// rather than inline. A missing handler slot passes the value or reason
    /// through unchanged, which is how rejections skip past `then` calls that
    /// only registered a fulfillment handler.
    ///
    /// # Errors
    /// [`PromiseError::InvalidArgument`] when the promise is settled and its
    /// recorded value is itself a thenable, which cannot be re-wrapped in a
    /// settled shortcut.
    ///
    /// # Example
    /// ```
    /// # use pledge::{Promise, TaskQueue, Value};
    /// # use std::rc::Rc;
    /// let queue = Rc::new(TaskQueue::new());
    /// let p = Promise::new(queue.clone());
    /// let doubled = p
    ///     .then(
    ///         Some(Box::new(|v: Value| match v {
    ///             Value::Int(n) => Ok(Value::Int(n * 2)),
    ///             other => Ok(other),
    ///         })),
    ///         None,
    ///     )
    ///     .unwrap();
    /// p.resolve(Value::from(21)).unwrap();
    /// assert_eq!(doubled.wait().unwrap(), Value::from(42));
    /// ```
    pub fn then(
        &self,
        on_fulfilled: Option<Handler>,
        on_rejected: Option<Handler>,
    ) -> Result<Promise, PromiseError> {
        let (state, current) = {
            let inner = self.inner.borrow();
            (inner.state, inner.current.clone())
        };

        match (state, current) {
            (State::Pending, _) => {
                let downstream = Promise::new(self.scheduler.clone());
                self.inner.borrow_mut().reactions.push(Reaction {
                    downstream: downstream.clone(),
                    on_fulfilled,
                    on_rejected,
                });
                Ok(downstream)
            }
            (State::Fulfilled, Some(value)) => {
                Ok(FulfilledPromise::new(value, self.scheduler.clone())?.then(on_fulfilled, None))
            }
            (State::Rejected, Some(reason)) => {
                Ok(RejectedPromise::new(reason, self.scheduler.clone())?.then(None, on_rejected))
            }
            (state, None) => Err(PromiseError::LogicViolation(format!(
                "{state} promise has no recorded value"
            ))),
        }
    }

    /// Fulfill the promise with `value`.
    ///
    /// Resolving with a thenable does not fulfill downstream reactions with
    /// the thenable itself: a still-pending [`Promise`] value adopts the
    /// reactions outright, and any other thenable is subscribed to so its
    /// eventual outcome drives them.
    ///
    /// # Errors
    /// - [`PromiseError::StateConflict`] when already settled differently;
    ///   re-resolving with the identical value is a no-op.
    /// - [`PromiseError::SelfSettlement`] when `value` is this promise.
    ///
    /// # Example
    /// ```
    /// # use pledge::{Promise, PromiseError, TaskQueue, Value};
    /// # use std::rc::Rc;
    /// let queue = Rc::new(TaskQueue::new());
    /// let p = Promise::new(queue);
    /// p.resolve(Value::from("a")).unwrap();
    /// assert!(p.resolve(Value::from("a")).is_ok()); // no-op
    /// assert!(matches!(
    ///     p.resolve(Value::from("b")),
    ///     Err(PromiseError::StateConflict { .. })
    /// ));
    /// ```
    pub fn resolve(&self, value: Value) -> Result<(), PromiseError> {
        self.settle(State::Fulfilled, value)
    }

    /// Reject the promise with `reason`.
    ///
    /// # Errors
    /// Same contract as [`resolve`](Promise::resolve): conflicting
    /// re-settlement and self-settlement are reported, identical
    /// re-rejection is a no-op.
    pub fn reject(&self, reason: Value) -> Result<(), PromiseError> {
        self.settle(State::Rejected, reason)
    }

    /// Register the callback [`wait`](Promise::wait) uses to drive a pending
    /// promise to settlement. Consumed on first use.
    pub fn set_wait_callback<F>(&self, callback: F)
    where
        F: FnOnce() -> Result<(), Value> + 'static,
    {
        self.inner.borrow_mut().wait_callback = Some(Box::new(callback));
    }

    /// Register the callback [`cancel`](Promise::cancel) invokes before
    /// force-rejecting a pending promise. Consumed on first use.
    pub fn set_cancel_callback<F>(&self, callback: F)
    where
        F: FnOnce() -> Result<(), Value> + 'static,
    {
        self.inner.borrow_mut().cancel_callback = Some(Box::new(callback));
    }

    /// Synchronously force the promise to completion and return its outcome.
    ///
    /// A pending promise is driven by consuming the registered wait callback
    /// (if any) and draining the scheduler; if it is still pending after
    /// that, the wait protocol was violated and the promise is force-rejected
    /// with an explanatory reason. When the settled value is itself a
    /// [`Promise`], `wait` recurses into it.
    ///
    /// # Errors
    /// - [`PromiseError::Rejected`] carrying the reason when the promise ends
    ///   up rejected.
    /// - [`PromiseError::WaitCallback`] when the wait callback failed after
    ///   the promise had already settled, so the failure could not be folded
    ///   into the promise.
    ///
    /// # Example
    /// ```
    /// # use pledge::{Promise, TaskQueue, Value};
    /// # use std::rc::Rc;
    /// let queue = Rc::new(TaskQueue::new());
    /// let p = Promise::new(queue);
    /// let driver = p.clone();
    /// p.set_wait_callback(move || {
    ///     driver
    ///         .resolve(Value::from("ready"))
    ///         .map_err(|e| Value::from(e.to_string()))
    /// });
    /// assert_eq!(p.wait().unwrap(), Value::from("ready"));
    /// ```
    pub fn wait(&self) -> Result<Value, PromiseError> {
        self.wait_in_pending_state()?;

        let (state, current) = {
            let inner = self.inner.borrow();
            (inner.state, inner.current.clone())
        };
        match (state, current) {
            (_, Some(Value::Promise(nested))) => nested.wait(),
            (State::Fulfilled, Some(value)) => Ok(value),
            (State::Rejected, Some(reason)) => Err(PromiseError::Rejected(reason)),
            (state, _) => Err(PromiseError::LogicViolation(format!(
                "wait left the promise {state} without a recorded value"
            ))),
        }
    }

    /// Cooperatively cancel a promise that has not yet settled.
    ///
    /// Returns `None` when the promise is already settled. Otherwise the
    /// registered cancel callback (if any) is consumed and invoked; a failure
    /// there becomes the rejection reason, and a promise left pending by the
    /// callback is rejected with the canonical `"promise has been cancelled"`
    /// reason. When the settled value
    /// is itself a [`Promise`], cancellation recurses into it. The rejection
    /// reason is returned; a cancel callback that chose to *fulfill* the
    /// promise instead yields `None`.
    ///
    /// # Example
    /// ```
    /// # use pledge::{Promise, State, TaskQueue, Value};
    /// # use std::rc::Rc;
    /// let queue = Rc::new(TaskQueue::new());
    /// let p = Promise::new(queue);
    /// let reason = p.cancel();
    /// assert_eq!(reason, Some(Value::from("promise has been cancelled")));
    /// assert_eq!(p.state(), State::Rejected);
    /// assert_eq!(p.cancel(), None); // second call is a no-op
    /// ```
    pub fn cancel(&self) -> Option<Value> {
        if self.state() != State::Pending {
            return None;
        }

        let callback = self.inner.borrow_mut().cancel_callback.take();
        if let Some(callback) = callback {
            if let Err(reason) = callback() {
                if let Err(err) = self.reject(reason) {
                    debug!("cancel callback failed after settling the promise: {err}");
                }
            }
        }

        if self.state() == State::Pending {
            // Cannot fail: the promise is pending and the reason is fresh.
            let _ = self.reject(Value::from(CANCELLED));
        }

        let (state, current) = {
            let inner = self.inner.borrow();
            (inner.state, inner.current.clone())
        };
        match (state, current) {
            (_, Some(Value::Promise(nested))) => nested.cancel(),
            (State::Rejected, current) => current,
            _ => None,
        }
    }

    /// Validate the settle rule, transition, and kick off propagation.
    fn settle(&self, requested: State, value: Value) -> Result<(), PromiseError> {
        {
            let inner = self.inner.borrow();
            if inner.state != State::Pending {
                if inner.state == requested && inner.current.as_ref() == Some(&value) {
                    return Ok(());
                }
                return Err(PromiseError::StateConflict {
                    actual: inner.state,
                    requested,
                });
            }
        }
        if let Value::Promise(ref nested) = value {
            if nested.ptr_eq(self) {
                return Err(PromiseError::SelfSettlement);
            }
        }

        trace!("promise settling as {requested}");
        let reactions = {
            let mut inner = self.inner.borrow_mut();
            inner.state = requested;
            inner.current = Some(value.clone());
            // A settled promise has no pending transition left for these
            // callbacks to drive.
            inner.wait_callback = None;
            inner.cancel_callback = None;
            mem::take(&mut inner.reactions)
        };
        self.propagate(requested, value, reactions);
        Ok(())
    }

    /// Hand the snapshotted reactions off according to what the promise was
    /// settled with: plain values dispatch through the scheduler, a pending
    /// nested promise adopts the reactions, and any other thenable is
    /// subscribed to.
    fn propagate(&self, settled: State, value: Value, reactions: Vec<Reaction>) {
        match value {
            Value::Promise(ref nested) if nested.state() == State::Pending => {
                // Adoption is a move: ownership of "who notifies these
                // reactions" transfers to the nested promise, appended after
                // its own so registration order is preserved.
                debug!(
                    "adopting {} reaction(s) onto a pending nested promise",
                    reactions.len()
                );
                nested.inner.borrow_mut().reactions.extend(reactions);
            }
            Value::Promise(ref nested) => {
                self.subscribe(nested, reactions);
            }
            Value::Thenable(ref source) => {
                self.subscribe(source.as_ref(), reactions);
            }
            plain => {
                let scheduler = self.scheduler.clone();
                scheduler.enqueue(Box::new(move || {
                    for reaction in reactions {
                        dispatch(reaction, settled, plain.clone());
                    }
                }));
                scheduler.drain();
            }
        }
    }

    /// Chain the snapshotted reactions onto an already-settled promise or a
    /// foreign thenable: whichever way the source settles, the whole batch is
    /// dispatched with that outcome. A source that refuses the subscription
    /// rejects the batch with the refusal as the reason.
    fn subscribe(&self, source: &dyn Thenable, reactions: Vec<Reaction>) {
        debug!(
            "subscribing {} reaction(s) to a {} thenable",
            reactions.len(),
            source.state()
        );
        let batch = Rc::new(RefCell::new(reactions));
        let on_fulfilled: Handler = {
            let batch = batch.clone();
            Box::new(move |value: Value| {
                for reaction in mem::take(&mut *batch.borrow_mut()) {
                    dispatch(reaction, State::Fulfilled, value.clone());
                }
                Ok(Value::Unit)
            })
        };
        let on_rejected: Handler = {
            let batch = batch.clone();
            Box::new(move |reason: Value| {
                for reaction in mem::take(&mut *batch.borrow_mut()) {
                    dispatch(reaction, State::Rejected, reason.clone());
                }
                Ok(Value::Unit)
            })
        };
        if let Err(err) = source.then(Some(on_fulfilled), Some(on_rejected)) {
            // The reactions were never handed over; rejecting them here keeps
            // their downstream promises from staying pending forever.
            warn!("failed to subscribe reactions to a thenable settle target: {err}");
            let reason = Value::from(err.to_string());
            for reaction in mem::take(&mut *batch.borrow_mut()) {
                dispatch(reaction, State::Rejected, reason.clone());
            }
        }
    }

    /// Consume the wait callback and drain the scheduler until the promise is
    /// no longer pending, force-rejecting on a wait-protocol violation.
    fn wait_in_pending_state(&self) -> Result<(), PromiseError> {
        if self.state() != State::Pending {
            return Ok(());
        }

        let callback = self.inner.borrow_mut().wait_callback.take();
        if let Some(callback) = callback {
            if let Err(reason) = callback() {
                if self.state() == State::Pending {
                    self.reject(reason)?;
                } else {
                    return Err(PromiseError::WaitCallback(reason));
                }
            }
        }

        self.scheduler.drain();

        if self.state() == State::Pending {
            warn!("wait callback did not settle the promise, force-rejecting");
            self.reject(Value::from(WAIT_UNRESOLVED))?;
        }
        Ok(())
    }
}

impl Thenable for Promise {
    fn state(&self) -> State {
        Promise::state(self)
    }

    fn then(
        &self,
        on_fulfilled: Option<Handler>,
        on_rejected: Option<Handler>,
    ) -> Result<Promise, PromiseError> {
        Promise::then(self, on_fulfilled, on_rejected)
    }
}

/// Run one reaction against a settlement. A downstream that is no longer
/// pending was already claimed by a race or a prior adoption and is left
/// alone. A missing handler slot is identity propagation.
fn dispatch(reaction: Reaction, settled: State, value: Value) {
    let Reaction {
        downstream,
        on_fulfilled,
        on_rejected,
    } = reaction;

    if downstream.state() != State::Pending {
        return;
    }

    let slot = match settled {
        State::Fulfilled => on_fulfilled,
        State::Rejected => on_rejected,
        State::Pending => return,
    };
    match slot {
        Some(handler) => settle_downstream(&downstream, handler(value)),
        None if settled == State::Fulfilled => settle_downstream(&downstream, Ok(value)),
        None => settle_downstream(&downstream, Err(value)),
    }
}

/// Settle a downstream promise with a handler outcome. A settle failure
/// (for example, a handler returning the downstream promise itself) is folded
/// into a rejection of that downstream rather than escaping the scheduler's
/// unit of work.
pub(crate) fn settle_downstream(downstream: &Promise, outcome: Result<Value, Value>) {
    let settled = match outcome {
        Ok(value) => downstream.resolve(value),
        Err(reason) => downstream.reject(reason),
    };
    if let Err(err) = settled {
        debug!("downstream settlement failed, folding into a rejection: {err}");
        let _ = downstream.reject(Value::from(err.to_string()));
    }
}
