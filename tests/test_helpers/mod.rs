#![allow(dead_code)]

use std::collections::VecDeque;
use usb_ctl_req::prelude::*;

/// One call the control pipe made on the bus.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BusOp {
    SetStalled(bool),
    Read(usize),
    Write(Vec<u8>),
    PacketReady,
    SetupDone(UsbDirection),
    InCompleteAccept,
    OutDone,
    StallSentAccept,
}

/// An endpoint zero that records every operation and plays the host side from a script.
pub struct MockBus {
    pub max_packet_size: u16,
    pub ops: Vec<BusOp>,
    pub stalled: bool,
    /// Packets handed to the hardware for transmission, zero-length packets included.
    pub sent: Vec<Vec<u8>>,
    fifo: Option<Vec<u8>>,
    tx: Vec<u8>,
    events: VecDeque<(PollResult, Vec<u8>)>,
}

impl MockBus {
    pub fn new(max_packet_size: u16) -> MockBus {
        MockBus {
            max_packet_size,
            ops: Vec::new(),
            stalled: false,
            sent: Vec::new(),
            fifo: None,
            tx: Vec::new(),
            events: VecDeque::new(),
        }
    }

    /// Places a received packet in the FIFO.
    pub fn receive(&mut self, data: &[u8]) {
        self.fifo = Some(data.to_vec());
    }

    /// Queues an event for `poll`. `data` is placed in the FIFO when the event is polled.
    pub fn queue(&mut self, event: PollResult, data: &[u8]) {
        self.events.push_back((event, data.to_vec()));
    }

    pub fn take_ops(&mut self) -> Vec<BusOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.sent)
    }
}

impl UsbBus for MockBus {
    fn ep0_max_packet_size(&self) -> u16 {
        self.max_packet_size
    }

    fn ep0_set_stalled(&mut self, stalled: bool) {
        self.ops.push(BusOp::SetStalled(stalled));
        self.stalled = stalled;
    }

    fn ep0_read(&mut self, buf: &mut [u8]) {
        self.ops.push(BusOp::Read(buf.len()));

        if buf.is_empty() {
            return;
        }

        let fifo = self.fifo.as_ref().expect("read from empty FIFO");
        assert!(buf.len() <= fifo.len(), "read past the end of the received packet");

        buf.copy_from_slice(&fifo[..buf.len()]);
    }

    fn ep0_write(&mut self, buf: &[u8]) {
        assert!(buf.len() <= self.max_packet_size as usize, "packet too long");

        self.ops.push(BusOp::Write(buf.to_vec()));
        self.tx.extend_from_slice(buf);
    }

    fn ep0_packet_ready(&mut self) {
        self.ops.push(BusOp::PacketReady);
        self.sent.push(std::mem::take(&mut self.tx));
    }

    fn ep0_setup_done(&mut self, direction: UsbDirection) {
        self.ops.push(BusOp::SetupDone(direction));
        self.fifo = None;
    }

    fn ep0_in_complete_accept(&mut self) {
        self.ops.push(BusOp::InCompleteAccept);
    }

    fn ep0_out_done(&mut self) {
        self.ops.push(BusOp::OutDone);
        self.fifo = None;
    }

    fn ep0_stall_sent_accept(&mut self) {
        self.ops.push(BusOp::StallSentAccept);
    }

    fn poll(&mut self) -> PollResult {
        match self.events.pop_front() {
            Some((event, data)) => {
                if !data.is_empty() {
                    self.fifo = Some(data);
                }

                event
            }
            None => PollResult::None,
        }
    }
}

pub type TestPipe<'h, 'b> = ControlPipe<'h, 'b, MockBus>;

pub fn setup_packet(bm_request_type: u8, request: u8, value: u16, index: u16, length: u16) -> [u8; 8] {
    let v = value.to_le_bytes();
    let i = index.to_le_bytes();
    let l = length.to_le_bytes();

    [bm_request_type, request, v[0], v[1], i[0], i[1], l[0], l[1]]
}

/// Delivers a SETUP packet to the pipe.
pub fn send_setup(pipe: &mut TestPipe, packet: [u8; 8]) {
    pipe.bus_mut().receive(&packet);
    pipe.handle_setup();
}

/// Delivers an OUT data packet to the pipe.
pub fn send_out(pipe: &mut TestPipe, data: &[u8]) {
    pipe.bus_mut().receive(data);
    pipe.handle_out(data.len());
}

/// Runs a complete IN transfer the way a host does and returns the data packets the device
/// sent. Returns `None` if the device stalled.
pub fn control_read(pipe: &mut TestPipe, packet: [u8; 8]) -> Option<Vec<Vec<u8>>> {
    pipe.bus_mut().take_sent();
    send_setup(pipe, packet);

    while pipe.state() == ControlState::DataIn {
        pipe.handle_in_complete();
    }

    if pipe.state() != ControlState::DataInStatus {
        return None;
    }

    let sent = pipe.bus_mut().take_sent();
    send_out(pipe, &[]);

    Some(sent)
}

/// Runs a complete OUT transfer the way a host does. Returns `false` if the device stalled.
pub fn control_write(pipe: &mut TestPipe, packet: [u8; 8], data: &[u8]) -> bool {
    send_setup(pipe, packet);

    let mps = pipe.max_packet_size();
    let mut chunks = data.chunks(mps);

    while pipe.state() == ControlState::DataOut {
        match chunks.next() {
            Some(chunk) => send_out(pipe, chunk),
            None => break,
        }
    }

    match pipe.state() {
        ControlState::DataOutStatus | ControlState::NoDataStatus => {
            pipe.handle_in_complete();
            true
        }
        _ => false,
    }
}

/// Concatenates the packets of an IN data stage.
pub fn join(packets: &[Vec<u8>]) -> Vec<u8> {
    packets.iter().flatten().copied().collect()
}
