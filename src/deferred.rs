use std::cell::RefCell;
use std::rc::Rc;

use crate::error::PromiseError;
use crate::promise::Promise;
use crate::scheduler::Scheduler;
use crate::value::Value;

/// The producer-side contract: something that owns a promise it intends to
/// settle.
pub trait Promisor {
    /// The promise this producer will settle.
    fn promise(&self) -> Promise;
}

/// Pairs settlement authority with a lazily-created [`Promise`].
///
/// The producer keeps the `Deferred` and hands out only the promise, so
/// consumers can observe the outcome but never settle it themselves.
///
/// # Example
/// ```
/// use pledge::{Deferred, Promisor, State, TaskQueue, Value};
/// use std::rc::Rc;
///
/// let queue = Rc::new(TaskQueue::new());
/// let deferred = Deferred::new(queue);
/// let promise = deferred.promise();
///
/// assert_eq!(promise.state(), State::Pending);
/// deferred.resolve(Value::from("done")).unwrap();
/// assert_eq!(promise.wait().unwrap(), Value::from("done"));
/// ```
pub struct Deferred {
    scheduler: Rc<dyn Scheduler>,
    promise: RefCell<Option<Promise>>,
}

impl Deferred {
    /// Create a deferred whose promise will run on the given scheduler.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Deferred {
            scheduler,
            promise: RefCell::new(None),
        }
    }

    /// Fulfill the owned promise with `value`.
    ///
    /// # Errors
    /// Same contract as [`Promise::resolve`].
    pub fn resolve(&self, value: Value) -> Result<(), PromiseError> {
        self.promise().resolve(value)
    }

    /// Reject the owned promise with `reason`.
    ///
    /// # Errors
    /// Same contract as [`Promise::reject`].
    pub fn reject(&self, reason: Value) -> Result<(), PromiseError> {
        self.promise().reject(reason)
    }
}

impl Promisor for Deferred {
    /// Lazily create and return the owned promise. Idempotent: every call
    /// returns a handle to the same promise.
    fn promise(&self) -> Promise {
        self.promise
            .borrow_mut()
            .get_or_insert_with(|| Promise::new(self.scheduler.clone()))
            .clone()
    }
}
