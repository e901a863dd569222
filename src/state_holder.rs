use core::cell::{Ref, RefCell};

use atomic::{Atomic, Ordering};
use critical_section::{CriticalSection, Mutex};
use heapless::Deque;

use crate::state::EncodedState;

pub struct StateHolder<S: EncodedState, const HISTORY_SIZE: usize> {
    history: Mutex<RefCell<Deque<S, HISTORY_SIZE>>>,
    state: Atomic<S>,
}

impl<S: EncodedState, const HISTORY_SIZE: usize> StateHolder<S, HISTORY_SIZE> {
    const HISTORY_NOT_EMPTY: () = assert!(HISTORY_SIZE > 0, "state history needs at least one slot");

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::HISTORY_NOT_EMPTY;

        Self {
            history: Mutex::new(RefCell::new(Deque::new())),
            state: Atomic::new(S::RESET),
        }
    }

    pub fn set_state(&self, state: S) {
        critical_section::with(|cs| {
            self.replace(cs, state);
        });
    }

    /// Records `state` and makes it current, returning the previous value.
    ///
    /// Callers that publish the previous value must keep `cs` held until they
    /// are done, otherwise a concurrent assignment can slip in between.
    pub fn replace(&self, cs: CriticalSection, state: S) -> S {
        let mut h = self.history.borrow_ref_mut(cs);
        if h.is_full() {
            h.pop_front();
        }
        // HISTORY_SIZE > 0, so a slot is free here.
        let _ = h.push_back(state);

        self.state.swap(state, Ordering::SeqCst)
    }

    pub fn get_state(&self) -> S {
        self.state.load(Ordering::SeqCst)
    }

    /// Oldest assignment first.
    pub fn get_history<'cs>(&'cs self, cs: CriticalSection<'cs>) -> Ref<'cs, Deque<S, HISTORY_SIZE>> {
        self.history.borrow_ref(cs)
    }

    pub fn clear_history(&self) {
        critical_section::with(|cs| self.history.borrow_ref_mut(cs).clear());
    }
}

impl<S: EncodedState, const HISTORY_SIZE: usize> Default for StateHolder<S, HISTORY_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MasterState, SlaveState};

    fn history<S: EncodedState, const N: usize>(holder: &StateHolder<S, N>) -> Vec<S> {
        critical_section::with(|cs| holder.get_history(cs).iter().copied().collect())
    }

    #[test]
    fn starts_at_reset_value() {
        let holder = StateHolder::<MasterState, 4>::new();

        assert_eq!(holder.get_state(), MasterState::Idle);
        assert!(history(&holder).is_empty());
    }

    #[test]
    fn records_assignments_in_order() {
        let holder = StateHolder::<SlaveState, 4>::new();

        holder.set_state(SlaveState::RcvAddr);
        holder.set_state(SlaveState::AddrAck);
        holder.set_state(SlaveState::Write);

        assert_eq!(holder.get_state(), SlaveState::Write);
        assert_eq!(
            history(&holder),
            [SlaveState::RcvAddr, SlaveState::AddrAck, SlaveState::Write]
        );
    }

    #[test]
    fn evicts_oldest_when_full() {
        let holder = StateHolder::<MasterState, 3>::new();

        for state in MasterState::ALL {
            holder.set_state(*state);
        }

        assert_eq!(holder.get_state(), MasterState::Complete);
        assert_eq!(
            history(&holder),
            [MasterState::WaitAck2, MasterState::Stop, MasterState::Complete]
        );
    }

    #[test]
    fn single_slot_history_keeps_latest() {
        let holder = StateHolder::<SlaveState, 1>::new();

        holder.set_state(SlaveState::Read);
        holder.set_state(SlaveState::DataAck);

        assert_eq!(history(&holder), [SlaveState::DataAck]);
    }

    #[test]
    fn replace_returns_previous_value() {
        let holder = StateHolder::<MasterState, 2>::new();

        let first = critical_section::with(|cs| holder.replace(cs, MasterState::Start));
        let second = critical_section::with(|cs| holder.replace(cs, MasterState::SendAddr));

        assert_eq!(first, MasterState::Idle);
        assert_eq!(second, MasterState::Start);
        assert_eq!(history(&holder), [MasterState::Start, MasterState::SendAddr]);
    }

    #[test]
    fn any_order_is_accepted() {
        let holder = StateHolder::<MasterState, 2>::new();

        holder.set_state(MasterState::Complete);
        holder.set_state(MasterState::Start);

        assert_eq!(holder.get_state(), MasterState::Start);
    }

    #[test]
    fn clear_history_keeps_state() {
        let holder = StateHolder::<SlaveState, 2>::new();
        holder.set_state(SlaveState::DataAck);

        holder.clear_history();

        assert_eq!(holder.get_state(), SlaveState::DataAck);
        assert!(history(&holder).is_empty());
    }
}
