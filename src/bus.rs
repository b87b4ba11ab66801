use crate::UsbDirection;

/// A trait for the endpoint zero part of device-specific USB peripherals. Implement this to add
/// support for a new hardware platform.
///
/// The methods are the primitive operations the [`ControlPipe`](crate::control_pipe::ControlPipe)
/// uses to drive a control transfer. None of them may block: they are called from the same context
/// that delivers endpoint zero events, which is usually an interrupt handler.
///
/// Every event reported by the peripheral is acknowledged exactly once through one of the
/// `*_accept`/`*_done` methods, even when the event was not expected in the current transfer
/// state.
pub trait UsbBus {
    /// Gets the maximum packet size of endpoint zero in bytes. Must be one of 8, 16, 32 or 64.
    fn ep0_max_packet_size(&self) -> u16;

    /// Sets or clears the STALL condition for endpoint zero. Clearing the condition also prepares
    /// the endpoint to receive data again.
    fn ep0_set_stalled(&mut self, stalled: bool);

    /// Reads `buf.len()` bytes of the packet currently held in the endpoint zero FIFO.
    fn ep0_read(&mut self, buf: &mut [u8]);

    /// Writes `buf` into the endpoint zero FIFO. The data is not sent until
    /// [`ep0_packet_ready`](UsbBus::ep0_packet_ready) is called. At most `ep0_max_packet_size`
    /// bytes are written per packet.
    fn ep0_write(&mut self, buf: &[u8]);

    /// Marks the data written to the FIFO since the last call as a complete packet ready for
    /// transmission. Calling this without writing any data sends a zero-length packet.
    fn ep0_packet_ready(&mut self);

    /// Acknowledges a received SETUP packet and sets the endpoint direction for the data stage
    /// that follows.
    fn ep0_setup_done(&mut self, direction: UsbDirection);

    /// Acknowledges a transmit complete event without queuing another packet.
    fn ep0_in_complete_accept(&mut self);

    /// Acknowledges a received OUT packet and releases the FIFO for the next one.
    fn ep0_out_done(&mut self);

    /// Acknowledges a STALL sent event.
    fn ep0_stall_sent_accept(&mut self);

    /// Gets the next pending endpoint zero event. Usually called in a loop or from an interrupt
    /// handler. See the [`PollResult`] enum for more information.
    ///
    /// The default implementation reports no events, for drivers that call the `handle_*` methods
    /// of the control pipe directly from their interrupt handlers.
    fn poll(&mut self) -> PollResult {
        PollResult::None
    }
}

impl<B: UsbBus + ?Sized> UsbBus for &mut B {
    fn ep0_max_packet_size(&self) -> u16 {
        (**self).ep0_max_packet_size()
    }

    fn ep0_set_stalled(&mut self, stalled: bool) {
        (**self).ep0_set_stalled(stalled)
    }

    fn ep0_read(&mut self, buf: &mut [u8]) {
        (**self).ep0_read(buf)
    }

    fn ep0_write(&mut self, buf: &[u8]) {
        (**self).ep0_write(buf)
    }

    fn ep0_packet_ready(&mut self) {
        (**self).ep0_packet_ready()
    }

    fn ep0_setup_done(&mut self, direction: UsbDirection) {
        (**self).ep0_setup_done(direction)
    }

    fn ep0_in_complete_accept(&mut self) {
        (**self).ep0_in_complete_accept()
    }

    fn ep0_out_done(&mut self) {
        (**self).ep0_out_done()
    }

    fn ep0_stall_sent_accept(&mut self) {
        (**self).ep0_stall_sent_accept()
    }

    fn poll(&mut self) -> PollResult {
        (**self).poll()
    }
}

/// Endpoint zero event information returned by [`UsbBus::poll`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollResult {
    /// No events to report.
    None,

    /// A SETUP packet has been received and is waiting in the FIFO.
    Setup,

    /// A packet written with [`UsbBus::ep0_packet_ready`] has finished transmitting.
    InComplete,

    /// An OUT packet of the contained length has been received and is waiting in the FIFO.
    OutData(usize),

    /// A STALL handshake has been sent to the host.
    StallSent,
}
