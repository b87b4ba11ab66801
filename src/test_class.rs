//! Vendor request handler for testing [`UsbBus`](crate::bus::UsbBus) implementations.
//!
//! Peripheral drivers should include an example that registers a [`TestHandler`] for vendor
//! requests so that a host can exercise every kind of control transfer against the driver.

use crate::control::{Recipient, Request};
use crate::handler::{ControlHandler, ControlRequest};
use core::cell::Cell;

/// Size of the buffer the tests assume.
pub const BUFFER_SIZE: usize = 128;

/// Stores the SETUP packet of this request in the first eight bytes of the buffer.
pub const REQ_STORE_REQUEST: u8 = 1;
/// Reads `wLength` bytes from the start of the buffer.
pub const REQ_READ_BUFFER: u8 = 2;
/// Writes `wLength` bytes to the start of the buffer.
pub const REQ_WRITE_BUFFER: u8 = 3;
/// A request the handler always rejects.
pub const REQ_UNKNOWN: u8 = 42;

/// Number of times each callback has been called.
#[derive(Copy, Clone, Default, Eq, PartialEq, Debug)]
pub struct CallCounts {
    /// [`ControlHandler::setup`]
    pub setup: usize,
    /// [`ControlHandler::in_acknowledged`]
    pub in_acknowledged: usize,
    /// [`ControlHandler::out_received`]
    pub out_received: usize,
    /// [`ControlHandler::out_acknowledged`]
    pub out_acknowledged: usize,
}

/// Vendor request handler that answers the `REQ_*` requests to the device recipient from a
/// shared buffer.
pub struct TestHandler<'b> {
    buffer: &'b [Cell<u8>],
    accept_out: bool,
    calls: CallCounts,
    last_request: Option<Request>,
}

impl<'b> TestHandler<'b> {
    /// Creates a handler that uses `buffer` for the data stage of its requests.
    pub fn new(buffer: &'b mut [u8]) -> TestHandler<'b> {
        TestHandler {
            buffer: Cell::from_mut(buffer).as_slice_of_cells(),
            accept_out: true,
            calls: CallCounts::default(),
            last_request: None,
        }
    }

    /// Sets whether received OUT data stages are accepted. When `false`, the handler rejects the
    /// data after it has been received, and the status stage is answered with a STALL.
    pub fn set_accept_out(&mut self, accept: bool) {
        self.accept_out = accept;
    }

    /// Gets the number of callback invocations so far.
    pub fn calls(&self) -> CallCounts {
        self.calls
    }

    /// Gets the last SETUP packet passed to the handler.
    pub fn last_request(&self) -> Option<Request> {
        self.last_request
    }

    /// Gets a byte of the buffer.
    pub fn byte(&self, index: usize) -> u8 {
        self.buffer[index].get()
    }

    /// Copies the start of the buffer into `dst`.
    pub fn read_buffer(&self, dst: &mut [u8]) {
        for (d, c) in dst.iter_mut().zip(self.buffer) {
            *d = c.get();
        }
    }
}

impl<'b> ControlHandler<'b> for TestHandler<'b> {
    fn setup(&mut self, req: &Request) -> ControlRequest<'b> {
        self.calls.setup += 1;
        self.last_request = Some(*req);

        if req.recipient != Recipient::Device {
            return ControlRequest::reject();
        }

        match req.request {
            REQ_STORE_REQUEST if req.length == 0 => {
                for (c, b) in self.buffer.iter().zip(req.to_bytes().iter()) {
                    c.set(*b);
                }

                ControlRequest::no_data()
            }
            REQ_READ_BUFFER if req.length as usize <= self.buffer.len() => {
                ControlRequest::data_in(req, self.buffer)
            }
            REQ_WRITE_BUFFER => ControlRequest::data_out(req, self.buffer),
            _ => ControlRequest::reject(),
        }
    }

    fn in_acknowledged(&mut self) {
        self.calls.in_acknowledged += 1;
    }

    fn out_received(&mut self) -> bool {
        self.calls.out_received += 1;
        self.accept_out
    }

    fn out_acknowledged(&mut self) {
        self.calls.out_acknowledged += 1;
    }
}
