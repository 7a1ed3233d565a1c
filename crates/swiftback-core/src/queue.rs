use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Unbounded FIFO shared between pipeline stages.
///
/// A producer signals end-of-stream with [`set_done`]; once the queue is
/// done and drained, every blocked consumer observes termination. The
/// synchronizer's join step additionally needs [`take_if`], an atomic
/// scan-and-remove under the queue lock. Flow control is implicit in the
/// finite size of the asset tree, so no capacity limit is imposed.
///
/// [`set_done`]: WorkQueue::set_done
/// [`take_if`]: WorkQueue::take_if
pub struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    cond: Condvar,
}

struct QueueState<T> {
    items: VecDeque<T>,
    done: bool,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                done: false,
            }),
            cond: Condvar::new(),
        }
    }

    pub fn push(&self, item: T) {
        self.state.lock().unwrap().items.push_back(item);
        self.cond.notify_one();
    }

    /// Producer signal: no more items will arrive.
    pub fn set_done(&self) {
        self.state.lock().unwrap().done = true;
        self.cond.notify_all();
    }

    pub fn reset_done(&self) {
        self.state.lock().unwrap().done = false;
    }

    pub fn is_done(&self) -> bool {
        self.state.lock().unwrap().done
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    /// Block until an item is available (`Some`) or the queue is done and
    /// drained (`None`).
    pub fn pop_wait(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.done {
                return None;
            }
            state = self.cond.wait(state).unwrap();
        }
    }

    /// Remove and return the first queued item matching `pred`, scanning
    /// under the queue lock so concurrent callers never race on the same
    /// element. Non-blocking.
    pub fn take_if(&self, pred: impl FnMut(&T) -> bool) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        let index = state.items.iter().position(pred)?;
        state.items.remove(index)
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
