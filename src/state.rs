use std::fmt;

/// The settlement state of a promise.
///
/// Every promise starts out [`Pending`](State::Pending) and settles at most
/// once, moving to either [`Fulfilled`](State::Fulfilled) or
/// [`Rejected`](State::Rejected). Both settled states are terminal; there is
/// no transition out of them and no transition that skips `Pending`.
///
/// # Example
/// ```
/// # use pledge::{Promise, State, TaskQueue, Value};
/// # use std::rc::Rc;
/// let queue = Rc::new(TaskQueue::new());
/// let p = Promise::new(queue);
/// assert_eq!(p.state(), State::Pending);
/// p.resolve(Value::from(1)).unwrap();
/// assert_eq!(p.state(), State::Fulfilled);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Not yet settled; reactions accumulate and dispatch later.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a reason.
    Rejected,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Pending => "pending",
            State::Fulfilled => "fulfilled",
            State::Rejected => "rejected",
        })
    }
}
