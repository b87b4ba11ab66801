use core::fmt;
use portable_atomic::{AtomicU32, Ordering};

/// A protocol anomaly detected by the control pipe.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Anomaly {
    /// An OUT data packet did not match the remaining length of the data stage.
    UnexpectedOutSize,
    /// The host acknowledged an IN data stage with a non-empty packet.
    NonzeroHandshake,
    /// A SETUP packet had the reserved type, or no handler set is registered for its type.
    BadSetupRequest,
    /// The peripheral reported an event that is not expected in the current transfer state.
    UnexpectedEvent,
    /// An OUT data packet was longer than the endpoint zero maximum packet size.
    PacketSizeError,
}

impl Anomaly {
    /// All anomaly kinds, in report order.
    pub const ALL: [Anomaly; 5] = [
        Anomaly::UnexpectedOutSize,
        Anomaly::NonzeroHandshake,
        Anomaly::BadSetupRequest,
        Anomaly::UnexpectedEvent,
        Anomaly::PacketSizeError,
    ];

    /// Gets the stable field name used in statistics reports.
    pub fn name(self) -> &'static str {
        match self {
            Anomaly::UnexpectedOutSize => "unexpected_out_size",
            Anomaly::NonzeroHandshake => "nonzero_handshake",
            Anomaly::BadSetupRequest => "bad_setup_request",
            Anomaly::UnexpectedEvent => "unexpected_event",
            Anomaly::PacketSizeError => "packet_size_error",
        }
    }
}

/// Anomaly counters of a control pipe.
///
/// The counters only ever increase and saturate at `u32::MAX`. They are atomic so that a
/// `static` block can be updated by the control pipe in interrupt context and read from
/// anywhere else:
///
/// ``` ignore
/// static USB_STATS: ControlStats = ControlStats::new();
///
/// let pipe = ControlPipe::new(bus, &USB_STATS);
/// ```
#[derive(Default)]
pub struct ControlStats {
    counters: [AtomicU32; 5],
}

impl ControlStats {
    /// Creates a counter block with all counters at zero.
    pub const fn new() -> Self {
        ControlStats {
            counters: [
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
            ],
        }
    }

    // Only the control pipe writes, so load and store are enough. Cores without CAS have no
    // read-modify-write atomics.
    pub(crate) fn record(&self, anomaly: Anomaly) {
        let counter = &self.counters[anomaly as usize];

        counter.store(counter.load(Ordering::Relaxed).saturating_add(1), Ordering::Relaxed);
    }

    /// Gets the current value of one counter.
    pub fn get(&self, anomaly: Anomaly) -> u32 {
        self.counters[anomaly as usize].load(Ordering::Relaxed)
    }

    /// Takes a copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            unexpected_out_size: self.get(Anomaly::UnexpectedOutSize),
            nonzero_handshake: self.get(Anomaly::NonzeroHandshake),
            bad_setup_request: self.get(Anomaly::BadSetupRequest),
            unexpected_event: self.get(Anomaly::UnexpectedEvent),
            packet_size_error: self.get(Anomaly::PacketSizeError),
        }
    }
}

/// A copy of the anomaly counters taken at one point in time.
///
/// The `Display` implementation writes one `name=value` line per nonzero counter.
#[derive(Copy, Clone, Default, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatsSnapshot {
    /// See [`Anomaly::UnexpectedOutSize`].
    pub unexpected_out_size: u32,
    /// See [`Anomaly::NonzeroHandshake`].
    pub nonzero_handshake: u32,
    /// See [`Anomaly::BadSetupRequest`].
    pub bad_setup_request: u32,
    /// See [`Anomaly::UnexpectedEvent`].
    pub unexpected_event: u32,
    /// See [`Anomaly::PacketSizeError`].
    pub packet_size_error: u32,
}

impl StatsSnapshot {
    /// Gets the value of one counter.
    pub fn get(&self, anomaly: Anomaly) -> u32 {
        match anomaly {
            Anomaly::UnexpectedOutSize => self.unexpected_out_size,
            Anomaly::NonzeroHandshake => self.nonzero_handshake,
            Anomaly::BadSetupRequest => self.bad_setup_request,
            Anomaly::UnexpectedEvent => self.unexpected_event,
            Anomaly::PacketSizeError => self.packet_size_error,
        }
    }

    /// Returns `true` if no anomaly has been recorded.
    pub fn is_clean(&self) -> bool {
        Anomaly::ALL.iter().all(|a| self.get(*a) == 0)
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for anomaly in Anomaly::ALL.iter() {
            let n = self.get(*anomaly);

            if n != 0 {
                writeln!(f, "{}={}", anomaly.name(), n)?;
            }
        }

        Ok(())
    }
}
