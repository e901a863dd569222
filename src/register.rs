use core::{
    cell::RefCell,
    sync::atomic::{AtomicUsize, Ordering},
};

use critical_section::{CriticalSection, Mutex};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel};
use heapless::Deque;

use crate::{
    error::{Error, Reason},
    state::{EncodedState, MasterState, SlaveState},
    state_holder::StateHolder,
    Event,
};

pub const STATES_HISTORY_SIZE: usize = 5;
pub const EVENTS_HISTORY_SIZE: usize = 5;

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateDump<S: EncodedState> {
    pub state_history: [S; STATES_HISTORY_SIZE],
    pub current_state: S,
    pub event_history: [Event<S>; EVENTS_HISTORY_SIZE],
}

pub type EventChannel<S, const SZ: usize> =
    channel::Channel<CriticalSectionRawMutex, Result<Event<S>, Error<S>>, SZ>;

/// State register of one sequencer.
///
/// Every assignment is published on a bounded channel so that a task can
/// follow the register while interrupt handlers drive it. When nobody drains
/// the channel, further events are dropped and counted, assignments still
/// take effect.
pub struct StateRegister<S: EncodedState, const CHSIZE: usize> {
    channel: EventChannel<S, CHSIZE>,
    dropped: AtomicUsize,

    state_holder: StateHolder<S, STATES_HISTORY_SIZE>,
    events_history: Mutex<RefCell<Deque<Event<S>, EVENTS_HISTORY_SIZE>>>,
}

pub type MasterRegister<const CHSIZE: usize> = StateRegister<MasterState, CHSIZE>;
pub type SlaveRegister<const CHSIZE: usize> = StateRegister<SlaveState, CHSIZE>;

#[cfg(feature = "dump")]
fn deque_into_array<T: Copy, const N: usize>(d: &Deque<T, N>, arr: &mut [T; N]) {
    let n = d.len();
    let (a, b) = d.as_slices();
    let s = N - n;

    arr[s..s + a.len()].copy_from_slice(a);
    arr[s + a.len()..].copy_from_slice(b);
}

impl<S: EncodedState, const CHSIZE: usize> StateRegister<S, CHSIZE> {
    pub const fn new() -> Self {
        Self {
            channel: EventChannel::new(),
            dropped: AtomicUsize::new(0),
            state_holder: StateHolder::new(),
            events_history: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    pub fn get_state(&self) -> S {
        self.state_holder.get_state()
    }

    /// Encoded register word of the current state.
    pub fn code(&self) -> u8 {
        self.get_state().code()
    }

    pub fn set_state(&self, state: S) {
        let from = self.assign(state, |from| Event::Assigned { from, to: state });
        trace!("{} -> {}", from, state);
    }

    /// Decodes a raw register word and assigns it.
    ///
    /// A word that names no state leaves the register untouched; the failure
    /// is both returned and published.
    pub fn load_raw(&self, code: u8) -> Result<S, Error<S>> {
        match S::from_code(code) {
            Ok(state) => {
                self.set_state(state);
                Ok(state)
            }
            Err(err) => {
                warn!("rejected raw state word {=u8}", code);
                let err = critical_section::with(|cs| {
                    let err = self.error(cs, Reason::Decode(err));
                    self.send_channel(Err(err));
                    err
                });
                Err(err)
            }
        }
    }

    pub fn reset(&self) {
        let from = self.assign(S::RESET, |from| Event::Reset { from });
        debug!("reset from {}", from);
    }

    pub async fn receive(&self) -> Result<Event<S>, Error<S>> {
        self.channel.receive().await
    }

    pub fn try_receive(&self) -> Option<Result<Event<S>, Error<S>>> {
        self.channel.try_receive().ok()
    }

    /// Number of events discarded because the channel was full.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Swaps in `state`, then records and publishes the event built from the
    /// previous value. All of it happens under one critical section so the
    /// published `from` always is the value that was replaced.
    fn assign(&self, state: S, event: impl FnOnce(S) -> Event<S>) -> S {
        critical_section::with(|cs| {
            let from = self.state_holder.replace(cs, state);
            let event = event(from);

            let mut h = self.events_history.borrow_ref_mut(cs);
            if h.is_full() {
                h.pop_front();
            }
            let _ = h.push_back(event);
            drop(h);

            self.send_channel(Ok(event));
            from
        })
    }

    fn send_channel(&self, result: Result<Event<S>, Error<S>>) {
        if self.channel.try_send(result).is_err() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!("event channel full, {=usize} dropped", dropped);
        }
    }

    #[cfg(feature = "dump")]
    fn error(&self, cs: CriticalSection, reason: Reason) -> Error<S> {
        Error {
            dump: self.dump_state_cs(cs),
            reason,
        }
    }

    #[cfg(not(feature = "dump"))]
    fn error(&self, _cs: CriticalSection, reason: Reason) -> Error<S> {
        Error {
            reason,
            _state: core::marker::PhantomData,
        }
    }

    #[cfg(feature = "dump")]
    pub fn dump_state(&self) -> StateDump<S> {
        critical_section::with(|cs| self.dump_state_cs(cs))
    }

    #[cfg(feature = "dump")]
    fn dump_state_cs(&self, cs: CriticalSection) -> StateDump<S> {
        let mut states = [S::RESET; STATES_HISTORY_SIZE];
        let mut events = [Event::Reset { from: S::RESET }; EVENTS_HISTORY_SIZE];

        deque_into_array(&self.state_holder.get_history(cs), &mut states);
        deque_into_array(&self.events_history.borrow_ref(cs), &mut events);

        StateDump {
            state_history: states,
            current_state: self.get_state(),
            event_history: events,
        }
    }
}

impl<S: EncodedState, const CHSIZE: usize> Default for StateRegister<S, CHSIZE> {
    fn default() -> Self {
        Self::new()
    }
}
