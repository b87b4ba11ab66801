use crate::stats::Anomaly;
use core::fmt;
use heapless::spsc::Producer;

/// A textual trace record of one protocol anomaly.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlEvent {
    /// The counter the anomaly was recorded in.
    pub anomaly: Anomaly,
    /// Short description of what happened.
    pub text: &'static str,
}

impl ControlEvent {
    pub(crate) const BAD_REQUEST_TYPE: ControlEvent =
        ControlEvent::new(Anomaly::BadSetupRequest, "setup: bad request type");
    pub(crate) const NONZERO_HANDSHAKE: ControlEvent =
        ControlEvent::new(Anomaly::NonzeroHandshake, "data in: nonzero handshake packet");
    pub(crate) const MORE_BYTES: ControlEvent =
        ControlEvent::new(Anomaly::UnexpectedOutSize, "data out: more bytes received");
    pub(crate) const FEWER_BYTES: ControlEvent =
        ControlEvent::new(Anomaly::UnexpectedOutSize, "data out: fewer bytes received");
    pub(crate) const PACKET_SIZE: ControlEvent =
        ControlEvent::new(Anomaly::PacketSizeError, "data out: packet size error");
    pub(crate) const UNEXPECTED_IN_COMPLETE: ControlEvent =
        ControlEvent::new(Anomaly::UnexpectedEvent, "unexpected in complete");
    pub(crate) const UNEXPECTED_OUT_DATA: ControlEvent =
        ControlEvent::new(Anomaly::UnexpectedEvent, "unexpected out data");
    pub(crate) const UNEXPECTED_STALL_SENT: ControlEvent =
        ControlEvent::new(Anomaly::UnexpectedEvent, "unexpected stall sent");

    const fn new(anomaly: Anomaly, text: &'static str) -> Self {
        ControlEvent { anomaly, text }
    }
}

impl fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "usb control: {}", self.text)
    }
}

/// Receives diagnostic events from a control pipe.
///
/// `emit` is called in the same context as the control pipe event handlers and must not block.
/// Sinks that forward events elsewhere should drop events they cannot forward immediately and
/// report that through their own channel.
pub trait EventSink {
    /// Handles one event.
    fn emit(&mut self, event: ControlEvent);
}

/// An [`EventSink`] that enqueues events into a `heapless` single-producer single-consumer queue
/// for a log task to print.
///
/// When the queue is full the event is dropped and `on_full` is called.
pub struct QueueSink<'q, const N: usize> {
    producer: Producer<'q, ControlEvent, N>,
    on_full: fn(),
}

impl<'q, const N: usize> QueueSink<'q, N> {
    /// Creates a sink that enqueues through `producer`.
    pub fn new(producer: Producer<'q, ControlEvent, N>, on_full: fn()) -> Self {
        QueueSink { producer, on_full }
    }
}

impl<const N: usize> EventSink for QueueSink<'_, N> {
    fn emit(&mut self, event: ControlEvent) {
        if self.producer.enqueue(event).is_err() {
            (self.on_full)();
        }
    }
}
