use crate::bus::{PollResult, UsbBus};
use crate::chunker::{InChunker, OutAssembler, OutPacket, MAX_PACKET_SIZE};
use crate::control::{Request, RequestType};
use crate::diag::{ControlEvent, EventSink};
use crate::handler::{Callbacks, ControlHandler, ControlRequest};
use crate::registry::HandlerRegistry;
use crate::stats::ControlStats;
use crate::UsbDirection;

/// State of the endpoint zero control transfer.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlState {
    /// No transfer in progress.
    Idle,
    /// Sending the data stage of an IN transfer.
    DataIn,
    /// Waiting for the host to acknowledge an IN data stage.
    DataInStatus,
    /// Receiving the data stage of an OUT transfer.
    DataOut,
    /// Sending the status stage of an OUT transfer.
    DataOutStatus,
    /// Starting the status stage of a transfer without a data stage.
    NoData,
    /// Sending the status stage of a transfer without a data stage.
    NoDataStatus,
    /// The last request was answered with a STALL. Only a new SETUP packet leaves this state.
    Stalled,
}

enum Transfer<'b> {
    None,
    In(InChunker<'b>),
    Out(OutAssembler<'b>),
}

/// Drives control transfers on endpoint zero.
///
/// The pipe receives the four endpoint zero events of the peripheral, either through the
/// `handle_*` methods called directly from the driver interrupt handler, or through
/// [`poll`](ControlPipe::poll). Each SETUP packet is dispatched to the handler set registered for
/// its request type, and the rest of the transfer is carried out according to the
/// [`ControlRequest`] the handler returned.
///
/// Only one transfer exists at a time. A SETUP packet always aborts the transfer in progress, and
/// the handler of the aborted transfer is not told about it.
pub struct ControlPipe<'h, 'b, B: UsbBus> {
    bus: B,
    max_packet_size: usize,
    handlers: HandlerRegistry<'h, 'b>,
    stats: &'h ControlStats,
    sink: Option<&'h mut dyn EventSink>,
    state: ControlState,
    request: Option<Request>,
    transfer: Transfer<'b>,
    packet: [u8; MAX_PACKET_SIZE],
}

impl<'h, 'b, B: UsbBus> ControlPipe<'h, 'b, B> {
    /// Creates a control pipe for the endpoint zero of `bus`, recording anomalies in `stats`.
    ///
    /// # Panics
    ///
    /// Panics if the endpoint zero maximum packet size reported by `bus` is not one of 8, 16, 32
    /// or 64.
    pub fn new(bus: B, stats: &'h ControlStats) -> Self {
        ControlPipe::from_parts(bus, stats, None, HandlerRegistry::new())
    }

    pub(crate) fn from_parts(
        bus: B,
        stats: &'h ControlStats,
        sink: Option<&'h mut dyn EventSink>,
        handlers: HandlerRegistry<'h, 'b>,
    ) -> Self {
        let max_packet_size = bus.ep0_max_packet_size();

        match max_packet_size {
            8 | 16 | 32 | 64 => {}
            _ => panic!("invalid ep0 max_packet_size"),
        }

        ControlPipe {
            bus,
            max_packet_size: max_packet_size as usize,
            handlers,
            stats,
            sink,
            state: ControlState::Idle,
            request: None,
            transfer: Transfer::None,
            packet: [0; MAX_PACKET_SIZE],
        }
    }

    /// Registers a handler set for standard, class or vendor requests. A later registration for
    /// the same request type replaces the earlier one.
    ///
    /// # Panics
    ///
    /// Panics if `request_type` is [`RequestType::Reserved`].
    pub fn register(&mut self, request_type: RequestType, handler: &'h mut dyn ControlHandler<'b>) {
        self.handlers.register(request_type, handler);
    }

    /// Registers a function pointer handler set.
    ///
    /// # Panics
    ///
    /// Panics if any of the four callbacks is missing, or if `request_type` is
    /// [`RequestType::Reserved`].
    pub fn register_callbacks(&mut self, request_type: RequestType, callbacks: &'h mut Callbacks<'b>) {
        self.handlers.register_callbacks(request_type, callbacks);
    }

    /// Sets the sink that receives a [`ControlEvent`] for every protocol anomaly.
    pub fn set_event_sink(&mut self, sink: &'h mut dyn EventSink) {
        self.sink = Some(sink);
    }

    /// Gets the current transfer state.
    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Gets the SETUP packet of the transfer in progress, if any.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// Gets the anomaly counters.
    pub fn stats(&self) -> &'h ControlStats {
        self.stats
    }

    /// Gets the endpoint zero maximum packet size.
    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    /// Gets a reference to the peripheral.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Gets a mutable reference to the peripheral.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Polls the [`UsbBus`] for one endpoint zero event and handles it. Returns `false` if there
    /// was no event.
    pub fn poll(&mut self) -> bool {
        match self.bus.poll() {
            PollResult::None => return false,
            PollResult::Setup => self.handle_setup(),
            PollResult::InComplete => self.handle_in_complete(),
            PollResult::OutData(count) => self.handle_out(count),
            PollResult::StallSent => self.handle_stall_sent(),
        }

        true
    }

    /// Handles a received SETUP packet. Any transfer in progress is abandoned.
    pub fn handle_setup(&mut self) {
        self.bus.ep0_set_stalled(false);
        self.transfer = Transfer::None;

        let mut setup = [0u8; Request::SIZE];
        self.bus.ep0_read(&mut setup);

        let req = Request::from_bytes(&setup);
        self.request = Some(req);

        usb_trace!("SETUP {:?}", req);

        let xfer = match self.handlers.get(req.request_type) {
            Some(handler) => handler.setup(&req),
            None => {
                self.anomaly(ControlEvent::BAD_REQUEST_TYPE);
                ControlRequest::reject()
            }
        };

        if let Some(buf) = xfer.in_buffer() {
            self.bus.ep0_setup_done(UsbDirection::In);
            self.state = ControlState::DataIn;
            self.transfer = Transfer::In(InChunker::new(
                buf,
                xfer.requested() as usize,
                self.max_packet_size,
            ));
            self.write_in_chunk();
        } else if let Some(buf) = xfer.out_buffer() {
            self.bus.ep0_setup_done(UsbDirection::Out);
            self.state = ControlState::DataOut;
            self.transfer = Transfer::Out(OutAssembler::new(buf, self.max_packet_size));
        } else if xfer.is_valid() {
            self.bus.ep0_setup_done(UsbDirection::Out);
            self.state = ControlState::NoData;
            self.bus.ep0_packet_ready();
            self.state = ControlState::NoDataStatus;
        } else {
            self.bus.ep0_setup_done(UsbDirection::Out);
            self.set_stalled();
        }
    }

    /// Handles the completion of a packet transmission.
    pub fn handle_in_complete(&mut self) {
        match self.state {
            ControlState::DataIn => {
                if self.in_remaining() > 0 {
                    self.write_in_chunk();
                } else if self.take_in_zlp() {
                    self.bus.ep0_packet_ready();
                } else {
                    self.bus.ep0_in_complete_accept();
                    self.state = ControlState::DataInStatus;
                }
            }
            ControlState::NoDataStatus | ControlState::DataOutStatus => {
                self.bus.ep0_in_complete_accept();

                if let Some(handler) = self.handlers.get(self.request_type()) {
                    handler.out_acknowledged();
                }

                self.set_idle();
            }
            _ => {
                self.anomaly(ControlEvent::UNEXPECTED_IN_COMPLETE);
                self.bus.ep0_in_complete_accept();
            }
        }
    }

    /// Handles a received OUT packet of `count` bytes.
    pub fn handle_out(&mut self, count: usize) {
        match self.state {
            ControlState::DataInStatus => {
                if count != 0 {
                    self.anomaly(ControlEvent::NONZERO_HANDSHAKE);
                }

                if let Some(handler) = self.handlers.get(self.request_type()) {
                    handler.in_acknowledged();
                }

                self.bus.ep0_out_done();
                self.set_idle();
            }
            ControlState::DataOut => self.handle_out_data(count),
            _ => {
                self.anomaly(ControlEvent::UNEXPECTED_OUT_DATA);
                self.bus.ep0_out_done();
            }
        }
    }

    /// Handles the confirmation that a STALL handshake was sent.
    pub fn handle_stall_sent(&mut self) {
        if self.state != ControlState::Stalled {
            self.anomaly(ControlEvent::UNEXPECTED_STALL_SENT);
        }

        self.bus.ep0_stall_sent_accept();
    }

    fn handle_out_data(&mut self, count: usize) {
        let (packet, remaining) = match &self.transfer {
            Transfer::Out(out) => (out.classify(count), out.remaining()),
            _ => (OutPacket::Mismatch, 0),
        };

        match packet {
            OutPacket::More => {
                self.read_out_packet(count);
                self.bus.ep0_out_done();
            }
            OutPacket::Last => {
                self.read_out_packet(count);
                self.bus.ep0_out_done();
                self.transfer = Transfer::None;

                let accepted = match self.handlers.get(self.request_type()) {
                    Some(handler) => handler.out_received(),
                    None => false,
                };

                if accepted {
                    self.bus.ep0_packet_ready();
                    self.state = ControlState::DataOutStatus;
                } else {
                    self.set_stalled();
                }
            }
            OutPacket::Mismatch | OutPacket::Oversize => {
                self.anomaly(if packet == OutPacket::Oversize {
                    ControlEvent::PACKET_SIZE
                } else if count > remaining {
                    ControlEvent::MORE_BYTES
                } else {
                    ControlEvent::FEWER_BYTES
                });

                self.bus.ep0_out_done();
                self.set_stalled();
            }
        }
    }

    fn request_type(&self) -> RequestType {
        self.request
            .map(|req| req.request_type)
            .unwrap_or(RequestType::Reserved)
    }

    fn in_remaining(&self) -> usize {
        match &self.transfer {
            Transfer::In(chunker) => chunker.remaining(),
            _ => 0,
        }
    }

    fn take_in_zlp(&mut self) -> bool {
        match &mut self.transfer {
            Transfer::In(chunker) => chunker.take_zlp(),
            _ => false,
        }
    }

    fn write_in_chunk(&mut self) {
        if let Transfer::In(chunker) = &mut self.transfer {
            let count = chunker.next_packet(&mut self.packet);

            self.bus.ep0_write(&self.packet[..count]);
            self.bus.ep0_packet_ready();
        }
    }

    fn read_out_packet(&mut self, count: usize) {
        if let Transfer::Out(out) = &mut self.transfer {
            let packet = &mut self.packet[..count];

            self.bus.ep0_read(packet);
            out.store(packet);
        }
    }

    fn anomaly(&mut self, event: ControlEvent) {
        usb_warn!("{} in state {:?}", event.text, self.state);

        self.stats.record(event.anomaly);

        if let Some(sink) = self.sink.as_mut() {
            sink.emit(event);
        }
    }

    fn set_idle(&mut self) {
        self.state = ControlState::Idle;
        self.request = None;
        self.transfer = Transfer::None;
    }

    fn set_stalled(&mut self) {
        self.bus.ep0_set_stalled(true);
        self.state = ControlState::Stalled;
        self.transfer = Transfer::None;
    }
}
