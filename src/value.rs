use std::fmt;
use std::rc::Rc;

use crate::error::PromiseError;
use crate::promise::Promise;
use crate::state::State;

/// A reaction callback.
///
/// Handlers receive the settled [`Value`] and either return the value the
/// downstream promise is resolved with, or fail with a reason that becomes
/// the downstream rejection. The `Err` channel is the moral equivalent of a
/// thrown exception in dynamic promise implementations.
pub type Handler = Box<dyn FnOnce(Value) -> Result<Value, Value>>;

/// The capability of being adopted as an asynchronous settle target.
///
/// Anything exposing `then` can be used to settle a [`Promise`]: instead of
/// fulfilling downstream reactions with the thenable itself, the promise
/// subscribes to (or adopts) the thenable's own eventual outcome. Plain
/// values never implement this trait, which is exactly what makes them plain:
/// resolving a promise with one fulfills it directly.
///
/// Implemented by [`Promise`], [`FulfilledPromise`](crate::FulfilledPromise)
/// and [`RejectedPromise`](crate::RejectedPromise); foreign sources may
/// implement it to participate in adoption through
/// [`Value::Thenable`].
pub trait Thenable {
    /// Current settlement state of this source.
    fn state(&self) -> State;

    /// Register reaction handlers and obtain the downstream promise.
    ///
    /// Either handler may be omitted; the missing slot propagates the
    /// value or reason through unchanged.
    fn then(
        &self,
        on_fulfilled: Option<Handler>,
        on_rejected: Option<Handler>,
    ) -> Result<Promise, PromiseError>;
}

/// The dynamic settlement currency of this crate.
///
/// Promises in JavaScript and PHP are untyped: a fulfillment value can be a
/// string, a list, or another promise, and the engine behaves differently for
/// each. `Value` is the closed-enum rendering of that: the plain variants
/// settle a promise directly, while [`Promise`](Value::Promise) and
/// [`Thenable`](Value::Thenable) are adoptable sources (see
/// [`Value::is_thenable`]).
///
/// Equality is structural for the plain variants and identity-based
/// (`Rc::ptr_eq`) for the promise-like ones, mirroring object identity in the
/// dynamic originals.
///
/// # Example
/// ```
/// # use pledge::Value;
/// assert_eq!(Value::from("hi"), Value::Str("hi".to_string()));
/// assert!(!Value::from(42).is_thenable());
/// ```
#[derive(Clone)]
pub enum Value {
    /// The absent value, used where dynamic implementations pass `null`.
    Unit,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Str(String),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A core promise; pending ones are adopted on settlement.
    Promise(Promise),
    /// Any other adoptable source.
    Thenable(Rc<dyn Thenable>),
}

impl Value {
    /// Whether this value is an adoptable asynchronous source rather than a
    /// plain settlement value.
    pub fn is_thenable(&self) -> bool {
        matches!(self, Value::Promise(_) | Value::Thenable(_))
    }

    /// Borrow the string payload, if this is a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this is a [`Value::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Promise(a), Value::Promise(b)) => a.ptr_eq(b),
            (Value::Thenable(a), Value::Thenable(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("Unit"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Promise(p) => write!(f, "Promise(<{}>)", p.state()),
            Value::Thenable(t) => write!(f, "Thenable(<{}>)", t.state()),
        }
    }
}

// `Display` is used when a value travels inside an error message, so plain
// variants render bare and promise-like ones render as their state.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Promise(p) => write!(f, "<{} promise>", p.state()),
            Value::Thenable(t) => write!(f, "<{} thenable>", t.state()),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Promise> for Value {
    fn from(p: Promise) -> Self {
        Value::Promise(p)
    }
}
