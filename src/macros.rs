// Crate-internal logging. Forwards to `log` or `defmt` when one of those features is enabled and
// compiles to nothing otherwise. `defmt` wins if both are enabled.

#[cfg(all(feature = "log", not(feature = "defmt")))]
macro_rules! usb_log {
    (trace, $($arg:expr),+) => { log::trace!($($arg),+) };
    (debug, $($arg:expr),+) => { log::debug!($($arg),+) };
    (warn, $($arg:expr),+) => { log::warn!($($arg),+) };
}

#[cfg(feature = "defmt")]
macro_rules! usb_log {
    (trace, $($arg:expr),+) => { defmt::trace!($($arg),+) };
    (debug, $($arg:expr),+) => { defmt::debug!($($arg),+) };
    (warn, $($arg:expr),+) => { defmt::warn!($($arg),+) };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! usb_log {
    ($level:ident, $($arg:expr),+) => {{
        let _ = ($(&$arg),+);
    }};
}

/// SETUP packets and other per-transfer detail.
macro_rules! usb_trace {
    ($($arg:expr),+ $(,)?) => (usb_log!(trace, $($arg),+));
}

/// Configuration and handler decisions.
macro_rules! usb_debug {
    ($($arg:expr),+ $(,)?) => (usb_log!(debug, $($arg),+));
}

/// Host protocol anomalies.
macro_rules! usb_warn {
    ($($arg:expr),+ $(,)?) => (usb_log!(warn, $($arg),+));
}
