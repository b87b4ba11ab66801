use crate::bus::UsbBus;
use crate::control::RequestType;
use crate::control_pipe::ControlPipe;
use crate::diag::EventSink;
use crate::handler::{Callbacks, ControlHandler};
use crate::registry::HandlerRegistry;
use crate::stats::ControlStats;

/// Used to build new [`ControlPipe`]s.
///
/// ``` ignore
/// static USB_STATS: ControlStats = ControlStats::new();
///
/// let mut vendor = MyVendorRequests::new();
///
/// let mut pipe = ControlPipeBuilder::new(bus, &USB_STATS)
///     .vendor(&mut vendor)
///     .build();
/// ```
pub struct ControlPipeBuilder<'h, 'b, B: UsbBus> {
    bus: B,
    stats: &'h ControlStats,
    sink: Option<&'h mut dyn EventSink>,
    handlers: HandlerRegistry<'h, 'b>,
}

macro_rules! handler_setters {
    ( $( $(#[$meta:meta])* $name:ident: $request_type:expr, )* ) => {
        $(
            $(#[$meta])*
            pub fn $name(self, handler: &'h mut dyn ControlHandler<'b>) -> Self {
                self.handler($request_type, handler)
            }
        )*
    }
}

impl<'h, 'b, B: UsbBus> ControlPipeBuilder<'h, 'b, B> {
    /// Creates a builder for a control pipe on the endpoint zero of `bus`.
    pub fn new(bus: B, stats: &'h ControlStats) -> Self {
        ControlPipeBuilder {
            bus,
            stats,
            sink: None,
            handlers: HandlerRegistry::new(),
        }
    }

    handler_setters! {
        /// Sets the handler set for standard requests.
        ///
        /// Default: none, standard requests are stalled
        standard: RequestType::Standard,

        /// Sets the handler set for class requests.
        ///
        /// Default: none, class requests are stalled
        class: RequestType::Class,

        /// Sets the handler set for vendor requests.
        ///
        /// Default: none, vendor requests are stalled
        vendor: RequestType::Vendor,
    }

    /// Sets the handler set for `request_type`.
    ///
    /// # Panics
    ///
    /// Panics if `request_type` is [`RequestType::Reserved`].
    pub fn handler(mut self, request_type: RequestType, handler: &'h mut dyn ControlHandler<'b>) -> Self {
        self.handlers.register(request_type, handler);
        self
    }

    /// Sets a function pointer handler set for `request_type`.
    ///
    /// # Panics
    ///
    /// Panics if any of the four callbacks is missing, or if `request_type` is
    /// [`RequestType::Reserved`].
    pub fn callbacks(mut self, request_type: RequestType, callbacks: &'h mut Callbacks<'b>) -> Self {
        self.handlers.register_callbacks(request_type, callbacks);
        self
    }

    /// Sets the sink that receives a diagnostic event for every protocol anomaly.
    ///
    /// Default: none, anomalies are only counted
    pub fn event_sink(mut self, sink: &'h mut dyn EventSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Creates the [`ControlPipe`].
    ///
    /// # Panics
    ///
    /// Panics if the endpoint zero maximum packet size of the bus is not one of 8, 16, 32 or 64.
    pub fn build(self) -> ControlPipe<'h, 'b, B> {
        ControlPipe::from_parts(self.bus, self.stats, self.sink, self.handlers)
    }
}
