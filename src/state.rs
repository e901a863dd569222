use core::{fmt, ops::RangeInclusive, str::FromStr};

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::DecodeError;

#[cfg(feature = "defmt")]
pub trait MaybeFormat: defmt::Format {}
#[cfg(feature = "defmt")]
impl<T: defmt::Format> MaybeFormat for T {}

#[cfg(not(feature = "defmt"))]
pub trait MaybeFormat {}
#[cfg(not(feature = "defmt"))]
impl<T> MaybeFormat for T {}

/// A declared state set: its values in declaration order, their labels and
/// the register encoding they occupy.
pub trait EncodedState:
    fmt::Debug + Copy + Eq + bytemuck::NoUninit + MaybeFormat + 'static
{
    /// Register width in bits.
    const WIDTH: u8;

    /// Every value, in declaration order.
    const ALL: &'static [Self];

    /// The value a register holds before its first assignment.
    const RESET: Self;

    fn label(self) -> &'static str;

    fn code(self) -> u8;

    fn from_code(code: u8) -> Result<Self, DecodeError>;

    fn from_label(label: &str) -> Result<Self, DecodeError> {
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.label() == label)
            .ok_or(DecodeError::UnknownLabel)
    }

    /// Codes that fit into the register but name no state.
    fn unused_codes() -> RangeInclusive<u8> {
        let max = ((1u16 << Self::WIDTH) - 1) as u8;
        (Self::ALL.len() as u8)..=max
    }
}

macro_rules! encoded_state {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $width:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            bytemuck::NoUninit,
            IntoPrimitive,
            TryFromPrimitive,
        )]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[repr(u8)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),*
        }

        impl EncodedState for $name {
            const WIDTH: u8 = $width;
            const ALL: &'static [Self] = &[$(Self::$variant),*];
            const RESET: Self = Self::ALL[0];

            fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),*
                }
            }

            fn code(self) -> u8 {
                self.into()
            }

            fn from_code(code: u8) -> Result<Self, DecodeError> {
                if u16::from(code) >= 1u16 << Self::WIDTH {
                    return Err(DecodeError::Overwide {
                        code,
                        width: Self::WIDTH,
                    });
                }

                Self::try_from(code).map_err(|_| DecodeError::Unassigned { code })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_label(s)
            }
        }
    };
}

encoded_state! {
    /// State of the bus master sequencer. Encoded in 4 bits.
    pub enum MasterState: 4 {
        Idle => "IDLE",
        Start => "START",
        SendAddr => "SEND_ADDR",
        SendData => "SEND_DATA",
        ReadData => "READ_DATA",
        /// First acknowledge wait.
        WaitAck1 => "WAIT_ACK_1",
        /// Second acknowledge wait.
        WaitAck2 => "WAIT_ACK_2",
        Stop => "STOP",
        Complete => "COMPLETE",
    }
}

encoded_state! {
    /// State of the bus slave sequencer. Encoded in 3 bits.
    pub enum SlaveState: 3 {
        Idle => "IDLE_S",
        RcvAddr => "RCV_ADDR",
        AddrAck => "ADDR_ACK",
        Read => "READ",
        Write => "WRITE",
        DataAck => "DATA_ACK",
        Stop => "STOP_S",
    }
}
