//! Endpoint zero control transfer handling for embedded USB devices.
//!
//! This crate implements the device side of the USB control transfer protocol for endpoint zero.
//! It parses SETUP packets, hands them to one of three registered handler sets (standard, class
//! or vendor requests), and then drives the data and status stages of the transfer on behalf of
//! the handler, including short packet and zero-length packet termination, STALL handling and
//! the abort of an unfinished transfer by a new SETUP packet.
//!
//! The hardware side is abstracted by the [`UsbBus`](bus::UsbBus) trait, which peripheral drivers
//! implement. The driver then forwards its four endpoint zero events (SETUP received, IN
//! complete, OUT data received, STALL sent) to a [`ControlPipe`](control_pipe::ControlPipe),
//! either directly from an interrupt handler or through [`ControlPipe::poll`](control_pipe::ControlPipe::poll).
//!
//! All handler callbacks run synchronously in the context that delivered the event, which is
//! usually an interrupt handler. They must return promptly and must never block.
//!
//! Protocol errors made by the host are never reported as Rust errors. They are answered with a
//! STALL, counted in a [`ControlStats`](stats::ControlStats) block, and optionally reported as
//! [`ControlEvent`](diag::ControlEvent)s to an [`EventSink`](diag::EventSink).
//!
//! Logging of the crate internals can be enabled with the `log` or `defmt` features.

#![no_std]
#![warn(missing_docs)]

#[macro_use]
mod macros;

/// A USB stack error.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbError {
    /// A SETUP packet was not exactly 8 bytes long.
    InvalidSetupPacket,

    /// A function-pointer handler set is missing one or more of its four callbacks.
    IncompleteHandlerSet,

    /// A buffer is too short for the data that was going to be written to or read from it.
    BufferOverflow,

    /// A descriptor has a length or type field that does not describe a valid descriptor.
    InvalidDescriptor,
}

/// Direction of USB traffic. Note that in the USB standard the direction is always indicated from
/// the perspective of the host, which is backward for devices, but the standard directions are
/// used for consistency.
///
/// The values of the enum also match the direction bit used in endpoint addresses and control
/// request types.
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbDirection {
    /// Host to device (OUT)
    Out = 0x00,
    /// Device to host (IN)
    In = 0x80,
}

impl From<u8> for UsbDirection {
    fn from(value: u8) -> Self {
        if value & 0x80 != 0 {
            UsbDirection::In
        } else {
            UsbDirection::Out
        }
    }
}

/// Result for USB operations.
pub type Result<T> = core::result::Result<T, UsbError>;

/// Abstraction of the endpoint zero hardware.
pub mod bus;

/// Setup token types, parsing and classification.
pub mod control;

/// Handler sets and the control requests they produce.
pub mod handler;

/// The endpoint zero control transfer state machine.
pub mod control_pipe;

/// Builder for [`ControlPipe`](control_pipe::ControlPipe).
pub mod pipe_builder;

/// Protocol anomaly counters.
pub mod stats;

/// Diagnostic event records and sinks.
pub mod diag;

/// Descriptor helpers for handler implementations.
pub mod descriptor;

/// Test vendor handler for testing USB peripheral driver implementations.
pub mod test_class;

mod chunker;
mod registry;

/// Prelude for peripheral drivers and applications.
pub mod prelude {
    pub use crate::bus::{PollResult, UsbBus};
    pub use crate::control::{Recipient, Request, RequestType};
    pub use crate::control_pipe::{ControlPipe, ControlState};
    pub use crate::diag::{ControlEvent, EventSink, QueueSink};
    pub use crate::handler::{Callbacks, ControlBuffer, ControlHandler, ControlRequest};
    pub use crate::pipe_builder::ControlPipeBuilder;
    pub use crate::stats::{Anomaly, ControlStats, StatsSnapshot};
    pub use crate::{UsbDirection, UsbError};
}
