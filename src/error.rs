use core::fmt;

#[cfg(feature = "dump")]
use crate::register::StateDump;
use crate::state::EncodedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The code does not fit into the register width.
    Overwide { code: u8, width: u8 },
    /// The code fits the register but no state is declared for it.
    Unassigned { code: u8 },
    UnknownLabel,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwide { code, width } => {
                write!(f, "code {code:#04x} does not fit a {width}-bit register")
            }
            Self::Unassigned { code } => write!(f, "code {code:#04x} names no state"),
            Self::UnknownLabel => f.write_str("unknown state label"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reason {
    Decode(DecodeError),
}

impl From<DecodeError> for Reason {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Error<S: EncodedState> {
    #[cfg(feature = "dump")]
    pub dump: StateDump<S>,
    pub reason: Reason,
    #[cfg(not(feature = "dump"))]
    pub(crate) _state: core::marker::PhantomData<S>,
}

impl<S: EncodedState> fmt::Display for Error<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            Reason::Decode(err) => write!(f, "state register rejected a raw word: {err}"),
        }
    }
}
