use crate::control::Request;
use crate::{Result, UsbDirection, UsbError};
use core::cell::Cell;
use core::cmp::min;

/// A data stage buffer lent to the control pipe by a handler for the duration of one transfer.
///
/// The handler keeps ownership of the memory. The control pipe only reads from it (IN transfers)
/// or writes into it (OUT transfers) while the transfer lasts. Memory the handler wants to modify
/// or inspect while it is lent out is shared as a slice of [`Cell`]s.
#[derive(Copy, Clone, Debug)]
pub enum ControlBuffer<'b> {
    /// No data.
    Empty,
    /// Read-only data, such as a static descriptor.
    Fixed(&'b [u8]),
    /// Handler memory shared with the control pipe.
    Shared(&'b [Cell<u8>]),
}

impl<'b> ControlBuffer<'b> {
    /// Gets the length of the buffer in bytes.
    pub fn len(&self) -> usize {
        match self {
            ControlBuffer::Empty => 0,
            ControlBuffer::Fixed(data) => data.len(),
            ControlBuffer::Shared(cells) => cells.len(),
        }
    }

    /// Returns `true` if the buffer holds no data.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets the first `len` bytes of the buffer, or the whole buffer if it is shorter.
    pub fn truncate(self, len: usize) -> ControlBuffer<'b> {
        match self {
            ControlBuffer::Empty => ControlBuffer::Empty,
            ControlBuffer::Fixed(data) => ControlBuffer::Fixed(&data[..min(len, data.len())]),
            ControlBuffer::Shared(cells) => ControlBuffer::Shared(&cells[..min(len, cells.len())]),
        }
    }

    /// Copies `dst.len()` bytes starting at `offset` into `dst`.
    pub(crate) fn copy_to(&self, offset: usize, dst: &mut [u8]) {
        match self {
            ControlBuffer::Empty => {}
            ControlBuffer::Fixed(data) => {
                dst.copy_from_slice(&data[offset..offset + dst.len()]);
            }
            ControlBuffer::Shared(cells) => {
                let end = offset + dst.len();

                for (d, c) in dst.iter_mut().zip(&cells[offset..end]) {
                    *d = c.get();
                }
            }
        }
    }
}

impl<'b> From<&'b [u8]> for ControlBuffer<'b> {
    fn from(data: &'b [u8]) -> Self {
        ControlBuffer::Fixed(data)
    }
}

impl<'b, const N: usize> From<&'b [u8; N]> for ControlBuffer<'b> {
    fn from(data: &'b [u8; N]) -> Self {
        ControlBuffer::Fixed(&data[..])
    }
}

impl<'b> From<&'b [Cell<u8>]> for ControlBuffer<'b> {
    fn from(cells: &'b [Cell<u8>]) -> Self {
        ControlBuffer::Shared(cells)
    }
}

impl<'b> From<&'b Cell<[u8]>> for ControlBuffer<'b> {
    fn from(cell: &'b Cell<[u8]>) -> Self {
        ControlBuffer::Shared(cell.as_slice_of_cells())
    }
}

#[derive(Copy, Clone, Debug)]
enum Stage<'b> {
    Reject,
    NoData,
    In(ControlBuffer<'b>),
    Out(&'b [Cell<u8>]),
}

/// The answer of a setup handler to a SETUP packet.
///
/// Use one of the constructors to build it: [`reject`](ControlRequest::reject) to stall the
/// request, [`no_data`](ControlRequest::no_data) to accept a request without a data stage,
/// [`data_in`](ControlRequest::data_in) to send data to the host or
/// [`data_out`](ControlRequest::data_out) to receive data from the host.
#[derive(Copy, Clone, Debug)]
pub struct ControlRequest<'b> {
    stage: Stage<'b>,
    requested: u16,
}

impl<'b> ControlRequest<'b> {
    /// Rejects the request. The control pipe answers it with a STALL.
    pub const fn reject() -> Self {
        ControlRequest {
            stage: Stage::Reject,
            requested: 0,
        }
    }

    /// Accepts a request that has no data stage. The status stage is started immediately.
    pub const fn no_data() -> Self {
        ControlRequest {
            stage: Stage::NoData,
            requested: 0,
        }
    }

    /// Accepts an IN request with `data` as the response. At most `req.length` bytes are sent.
    pub fn data_in(req: &Request, data: impl Into<ControlBuffer<'b>>) -> Self {
        ControlRequest {
            stage: Stage::In(data.into().truncate(req.length as usize)),
            requested: req.length,
        }
    }

    /// Accepts an OUT request and lends `buf` to receive its data stage. The request is rejected
    /// if `buf` is too short to hold `req.length` bytes, and treated as
    /// [`no_data`](ControlRequest::no_data) if the request has no data stage.
    pub fn data_out(req: &Request, buf: &'b [Cell<u8>]) -> Self {
        let len = req.length as usize;

        if len == 0 {
            return ControlRequest::no_data();
        }

        if buf.len() < len {
            usb_debug!("data_out buffer too short: {} < {}", buf.len(), len);
            return ControlRequest::reject();
        }

        ControlRequest {
            stage: Stage::Out(&buf[..len]),
            requested: req.length,
        }
    }

    /// Returns `false` if the request was rejected.
    pub fn is_valid(&self) -> bool {
        !matches!(self.stage, Stage::Reject)
    }

    /// Gets the direction of the data stage. Requests without a data stage are OUT requests.
    pub fn direction(&self) -> UsbDirection {
        match self.stage {
            Stage::In(_) => UsbDirection::In,
            _ => UsbDirection::Out,
        }
    }

    /// Gets the number of bytes the data stage will transfer.
    pub fn length(&self) -> usize {
        match self.stage {
            Stage::In(buf) => buf.len(),
            Stage::Out(cells) => cells.len(),
            _ => 0,
        }
    }

    /// Gets the data stage length the host asked for in the SETUP packet.
    pub fn requested(&self) -> u16 {
        self.requested
    }

    pub(crate) fn in_buffer(&self) -> Option<ControlBuffer<'b>> {
        match self.stage {
            Stage::In(buf) => Some(buf),
            _ => None,
        }
    }

    pub(crate) fn out_buffer(&self) -> Option<&'b [Cell<u8>]> {
        match self.stage {
            Stage::Out(cells) => Some(cells),
            _ => None,
        }
    }
}

/// A handler set for one category of control requests (standard, class or vendor).
///
/// All methods are called synchronously from the context that delivered the endpoint zero event,
/// which is usually an interrupt handler. Implementations must return promptly and must not block,
/// sleep or wait for other events.
///
/// A transfer that is aborted by a new SETUP packet is dropped silently; the handler is not told.
pub trait ControlHandler<'b> {
    /// Called when a SETUP packet of this handler's category is received. The returned request
    /// decides how the rest of the transfer proceeds.
    fn setup(&mut self, req: &Request) -> ControlRequest<'b>;

    /// Called when the host has acknowledged the data stage of an IN transfer.
    fn in_acknowledged(&mut self);

    /// Called when the whole data stage of an OUT transfer has been written into the buffer lent
    /// by [`setup`](ControlHandler::setup). Return `true` to accept the data or `false` to answer
    /// the status stage with a STALL.
    fn out_received(&mut self) -> bool;

    /// Called when the status stage of an OUT or no-data transfer has been sent to the host.
    fn out_acknowledged(&mut self);
}

/// A handler set built from plain function pointers.
///
/// All four callbacks must be set before the set is registered with a control pipe; registering an
/// incomplete set panics.
#[derive(Copy, Clone, Default)]
pub struct Callbacks<'b> {
    /// See [`ControlHandler::setup`].
    pub setup: Option<fn(&Request) -> ControlRequest<'b>>,
    /// See [`ControlHandler::in_acknowledged`].
    pub in_acknowledged: Option<fn()>,
    /// See [`ControlHandler::out_received`].
    pub out_received: Option<fn() -> bool>,
    /// See [`ControlHandler::out_acknowledged`].
    pub out_acknowledged: Option<fn()>,
}

impl<'b> Callbacks<'b> {
    /// Creates an empty callback set.
    pub const fn new() -> Self {
        Callbacks {
            setup: None,
            in_acknowledged: None,
            out_received: None,
            out_acknowledged: None,
        }
    }

    /// Checks that all four callbacks are set.
    ///
    /// # Errors
    ///
    /// * [`IncompleteHandlerSet`](crate::UsbError::IncompleteHandlerSet) - At least one of the
    ///   callbacks is missing.
    pub fn check(&self) -> Result<()> {
        if self.setup.is_some()
            && self.in_acknowledged.is_some()
            && self.out_received.is_some()
            && self.out_acknowledged.is_some()
        {
            Ok(())
        } else {
            Err(UsbError::IncompleteHandlerSet)
        }
    }
}

impl<'b> ControlHandler<'b> for Callbacks<'b> {
    fn setup(&mut self, req: &Request) -> ControlRequest<'b> {
        match self.setup {
            Some(f) => f(req),
            None => ControlRequest::reject(),
        }
    }

    fn in_acknowledged(&mut self) {
        if let Some(f) = self.in_acknowledged {
            f();
        }
    }

    fn out_received(&mut self) -> bool {
        match self.out_received {
            Some(f) => f(),
            None => false,
        }
    }

    fn out_acknowledged(&mut self) {
        if let Some(f) = self.out_acknowledged {
            f();
        }
    }
}
