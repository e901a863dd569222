#![cfg_attr(not(test), no_std)]

//! State sets of an I2C master sequencer and an I2C slave sequencer, with a
//! register type that holds one of them and reports every assignment.

mod fmt;

mod error;
mod register;
mod state;
mod state_holder;

pub use error::{DecodeError, Error, Reason};
pub use register::{
    EventChannel, MasterRegister, SlaveRegister, StateRegister, EVENTS_HISTORY_SIZE,
    STATES_HISTORY_SIZE,
};
pub use state::{EncodedState, MasterState, SlaveState};
pub use state_holder::StateHolder;

#[cfg(feature = "dump")]
pub use register::StateDump;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event<S> {
    Assigned { from: S, to: S },
    Reset { from: S },
}
