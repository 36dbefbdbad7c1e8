use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// A zero-argument unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// The narrow contract through which the promise core defers work.
///
/// The core never executes reaction handlers on the stack that registered
/// them; it hands them to a scheduler as [`Task`]s and asks the scheduler to
/// run everything it holds. Implementations must preserve FIFO order among
/// tasks enqueued by the same settlement, and [`drain`](Scheduler::drain)
/// must:
///
/// - run until the queue is empty, *including* tasks enqueued as a side
///   effect of draining,
/// - be a no-op on an empty queue, and
/// - be safe to call from within a task that is itself being drained
///   (a nested call may return immediately; the outer drain picks up any
///   work the nested caller enqueued before it returns).
///
/// Schedulers are passed explicitly to every promise constructor, so separate
/// promise graphs can run on separate queues and tests stay isolated.
pub trait Scheduler {
    /// Schedule a unit of work for later execution.
    fn enqueue(&self, task: Task);

    /// Execute all queued work to emptiness.
    fn drain(&self);
}

/// The reference [`Scheduler`]: a single-threaded FIFO task queue.
///
/// # Example
/// ```
/// # use pledge::{Scheduler, TaskQueue};
/// # use std::cell::Cell;
/// # use std::rc::Rc;
/// let queue = TaskQueue::new();
/// let ran = Rc::new(Cell::new(false));
/// let flag = ran.clone();
/// queue.enqueue(Box::new(move || flag.set(true)));
/// assert!(!ran.get());
/// queue.drain();
/// assert!(ran.get());
/// ```
#[derive(Default)]
pub struct TaskQueue {
    tasks: RefCell<VecDeque<Task>>,
    draining: Cell<bool>,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks currently queued.
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Whether no tasks are queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }
}

impl Scheduler for TaskQueue {
    fn enqueue(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }

    fn drain(&self) {
        // A task may drain the queue it is running on; the guard turns the
        // nested call into a no-op and the loop below consumes whatever that
        // task enqueued before the outer call returns.
        if self.draining.get() {
            return;
        }
        self.draining.set(true);
        loop {
            // The borrow must end before the task runs, since the task may
            // enqueue more work.
            let task = self.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
        self.draining.set(false);
    }
}
