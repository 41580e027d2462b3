//! Tasks and their one-shot completion signals.
//!
//! A [`Task`] is the unit of work flowing workload generator → client →
//! server. Its completion is announced through a [`CompletionSignal`]: a
//! single-assignment slot that collects waiting continuations while pending
//! and releases them exactly once when fulfilled. Fulfilling twice is a
//! defect; the second fulfill is rejected with [`SignalError::AlreadyFulfilled`]
//! so racing replicas resolve to a single winner.

use thiserror::Error;

/// A unit of work dispatched by a client to one or more servers.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: u64,
    /// The client that owns this task's dispatch and response segments.
    pub client_id: usize,
    /// Virtual time of creation, in microseconds.
    pub start_us: u64,
    /// Per-server scores reported by the selection policy at dispatch time,
    /// kept for policy introspection.
    pub policy_scores: Option<Vec<f64>>,
}

impl Task {
    pub fn new(id: u64, client_id: usize, start_us: u64) -> Self {
        Self {
            id,
            client_id,
            start_us,
            policy_scores: None,
        }
    }
}

/// Payload delivered to waiters when a task completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// The server whose service finished first.
    pub server_id: usize,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignalError {
    #[error("completion signal already fulfilled")]
    AlreadyFulfilled,
}

enum SignalState<W> {
    Pending { waiters: Vec<W> },
    Fulfilled(Completion),
}

/// One-shot completion signal: pending → fulfilled, exactly once.
///
/// `W` is the continuation type the scheduler resumes; waiters are released
/// in registration order so same-instant resumptions stay FIFO.
pub struct CompletionSignal<W> {
    state: SignalState<W>,
}

impl<W> CompletionSignal<W> {
    pub fn new() -> Self {
        Self {
            state: SignalState::Pending {
                waiters: Vec::new(),
            },
        }
    }

    /// Register a continuation to resume on completion.
    ///
    /// If the signal is already fulfilled, the payload is returned and the
    /// caller schedules the continuation itself (at zero delay, like any
    /// other waiter).
    pub fn wait(&mut self, waiter: W) -> Option<Completion> {
        match &mut self.state {
            SignalState::Pending { waiters } => {
                waiters.push(waiter);
                None
            }
            SignalState::Fulfilled(completion) => Some(*completion),
        }
    }

    /// Fulfill the signal, returning the waiters to wake in FIFO order.
    ///
    /// At most one fulfill succeeds; later attempts get
    /// [`SignalError::AlreadyFulfilled`] and must not disturb the recorded
    /// completion.
    pub fn fulfill(&mut self, completion: Completion) -> Result<Vec<W>, SignalError> {
        match &mut self.state {
            SignalState::Pending { waiters } => {
                let woken = std::mem::take(waiters);
                self.state = SignalState::Fulfilled(completion);
                Ok(woken)
            }
            SignalState::Fulfilled(_) => Err(SignalError::AlreadyFulfilled),
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self.state, SignalState::Fulfilled(_))
    }

    /// The completion payload, once fulfilled.
    pub fn completion(&self) -> Option<Completion> {
        match &self.state {
            SignalState::Fulfilled(completion) => Some(*completion),
            SignalState::Pending { .. } => None,
        }
    }
}

impl<W> Default for CompletionSignal<W> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fulfill_releases_waiters_in_fifo_order() {
        let mut signal: CompletionSignal<&str> = CompletionSignal::new();
        assert!(signal.wait("first").is_none());
        assert!(signal.wait("second").is_none());

        let woken = signal.fulfill(Completion { server_id: 3 }).unwrap();
        assert_eq!(woken, vec!["first", "second"]);
        assert_eq!(signal.completion(), Some(Completion { server_id: 3 }));
    }

    #[test]
    fn test_double_fulfill_is_rejected() {
        let mut signal: CompletionSignal<u32> = CompletionSignal::new();
        signal.fulfill(Completion { server_id: 0 }).unwrap();

        // The losing replica of a fan-out race lands here.
        let err = signal.fulfill(Completion { server_id: 1 }).unwrap_err();
        assert_eq!(err, SignalError::AlreadyFulfilled);
        // First writer wins; the payload is untouched.
        assert_eq!(signal.completion(), Some(Completion { server_id: 0 }));
    }

    #[test]
    fn test_wait_after_fulfill_returns_payload() {
        let mut signal: CompletionSignal<u32> = CompletionSignal::new();
        signal.fulfill(Completion { server_id: 2 }).unwrap();
        assert_eq!(signal.wait(7), Some(Completion { server_id: 2 }));
    }

    #[test]
    fn test_task_captures_creation_time() {
        let task = Task::new(9, 1, 4_200_000);
        assert_eq!(task.id, 9);
        assert_eq!(task.start_us, 4_200_000);
        assert!(task.policy_scores.is_none());
    }
}
