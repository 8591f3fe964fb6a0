//! Task-coalescing gate
//!
//! An explicit three-state machine (Idle, Running, RunningWithPending)
//! guarding a non-reentrant task. Concurrent triggers while a run is in
//! flight are collapsed according to the configured policy instead of
//! stacking nested futures.

use std::collections::VecDeque;
use std::mem;

/// What happens to inputs offered while a run is already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoalescePolicy {
    /// Concurrent inputs are dropped; callers share the in-flight run.
    Merge,
    /// Every input runs, in arrival order.
    Queue,
    /// Keep only the first stashed input.
    First,
    /// Keep only the most recent stashed input.
    Last,
}

/// Admission decision for one offered input.
#[derive(Debug, PartialEq, Eq)]
pub enum Admission<T> {
    /// Caller owns the run; it must call [`TaskGate::on_complete`] when done.
    Run(T),
    /// Input was coalesced into the in-flight run.
    Coalesced,
}

enum GateState<T> {
    Idle,
    Running,
    RunningWithPending(VecDeque<T>),
}

pub struct TaskGate<T> {
    policy: CoalescePolicy,
    state: GateState<T>,
}

impl<T> TaskGate<T> {
    pub fn new(policy: CoalescePolicy) -> Self {
        Self {
            policy,
            state: GateState::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, GateState::Idle)
    }

    /// Offer an input. Returns `Run` when the gate was idle (the caller now
    /// owns the run), `Coalesced` otherwise.
    pub fn offer(&mut self, input: T) -> Admission<T> {
        match &mut self.state {
            GateState::Idle => {
                self.state = GateState::Running;
                Admission::Run(input)
            }
            GateState::Running => {
                if self.policy != CoalescePolicy::Merge {
                    self.state = GateState::RunningWithPending(VecDeque::from([input]));
                }
                Admission::Coalesced
            }
            GateState::RunningWithPending(pending) => {
                match self.policy {
                    CoalescePolicy::Merge => {}
                    CoalescePolicy::Queue => pending.push_back(input),
                    CoalescePolicy::First => {}
                    CoalescePolicy::Last => {
                        pending.clear();
                        pending.push_back(input);
                    }
                }
                Admission::Coalesced
            }
        }
    }

    /// Report the owned run finished. Returns the next stashed input when
    /// one is pending; the caller keeps ownership and runs it too.
    pub fn on_complete(&mut self) -> Option<T> {
        match mem::replace(&mut self.state, GateState::Idle) {
            GateState::Idle | GateState::Running => None,
            GateState::RunningWithPending(mut pending) => {
                let next = pending.pop_front();
                if next.is_some() {
                    self.state = if pending.is_empty() {
                        GateState::Running
                    } else {
                        GateState::RunningWithPending(pending)
                    };
                }
                next
            }
        }
    }

    /// Drop any pending input and return to idle. Used when the owned run
    /// fails and the error is surfaced instead of retried.
    pub fn reset(&mut self) {
        self.state = GateState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<T>(gate: &mut TaskGate<T>, input: T) -> T {
        match gate.offer(input) {
            Admission::Run(input) => input,
            Admission::Coalesced => panic!("expected to own the run"),
        }
    }

    #[test]
    fn test_idle_admits() {
        let mut gate = TaskGate::new(CoalescePolicy::Last);
        assert_eq!(run(&mut gate, 1), 1);
        assert!(!gate.is_idle());
        assert_eq!(gate.on_complete(), None);
        assert!(gate.is_idle());
    }

    #[test]
    fn test_merge_drops_concurrent_inputs() {
        let mut gate = TaskGate::new(CoalescePolicy::Merge);
        run(&mut gate, 1);
        assert_eq!(gate.offer(2), Admission::Coalesced);
        assert_eq!(gate.offer(3), Admission::Coalesced);
        assert_eq!(gate.on_complete(), None);
    }

    #[test]
    fn test_queue_keeps_all_in_order() {
        let mut gate = TaskGate::new(CoalescePolicy::Queue);
        run(&mut gate, 1);
        gate.offer(2);
        gate.offer(3);
        assert_eq!(gate.on_complete(), Some(2));
        assert_eq!(gate.on_complete(), Some(3));
        assert_eq!(gate.on_complete(), None);
        assert!(gate.is_idle());
    }

    #[test]
    fn test_first_keeps_first_stashed() {
        let mut gate = TaskGate::new(CoalescePolicy::First);
        run(&mut gate, 1);
        gate.offer(2);
        gate.offer(3);
        assert_eq!(gate.on_complete(), Some(2));
        assert_eq!(gate.on_complete(), None);
    }

    #[test]
    fn test_last_keeps_most_recent() {
        let mut gate = TaskGate::new(CoalescePolicy::Last);
        run(&mut gate, 1);
        gate.offer(2);
        gate.offer(3);
        assert_eq!(gate.on_complete(), Some(3));
        assert_eq!(gate.on_complete(), None);
    }

    #[test]
    fn test_reset_discards_pending() {
        let mut gate = TaskGate::new(CoalescePolicy::Last);
        run(&mut gate, 1);
        gate.offer(2);
        gate.reset();
        assert!(gate.is_idle());
        assert_eq!(run(&mut gate, 4), 4);
    }
}
