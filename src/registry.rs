use crate::control::RequestType;
use crate::handler::{Callbacks, ControlHandler};
use heapless::LinearMap;

// Standard, class and vendor.
const MAX_HANDLERS: usize = 3;

/// Handler sets keyed by request type.
pub(crate) struct HandlerRegistry<'h, 'b> {
    handlers: LinearMap<RequestType, &'h mut dyn ControlHandler<'b>, MAX_HANDLERS>,
}

impl<'h, 'b> HandlerRegistry<'h, 'b> {
    pub const fn new() -> Self {
        HandlerRegistry {
            handlers: LinearMap::new(),
        }
    }

    /// Registers `handler` for `request_type`, replacing any previous registration.
    ///
    /// # Panics
    ///
    /// Panics if `request_type` is [`RequestType::Reserved`].
    pub fn register(&mut self, request_type: RequestType, handler: &'h mut dyn ControlHandler<'b>) {
        if request_type == RequestType::Reserved {
            panic!("cannot register a handler set for reserved requests");
        }

        usb_debug!("registering {:?} handler set", request_type);

        // Only three keys pass the check above.
        if self.handlers.insert(request_type, handler).is_err() {
            panic!("handler registry full");
        }
    }

    /// Registers a function pointer handler set.
    ///
    /// # Panics
    ///
    /// Panics if any of the four callbacks is missing or `request_type` is
    /// [`RequestType::Reserved`].
    pub fn register_callbacks(&mut self, request_type: RequestType, callbacks: &'h mut Callbacks<'b>) {
        callbacks
            .check()
            .expect("incomplete control request handler set");

        self.register(request_type, callbacks);
    }

    pub fn get(&mut self, request_type: RequestType) -> Option<&mut (dyn ControlHandler<'b> + 'h)> {
        match self.handlers.get_mut(&request_type) {
            Some(handler) => Some(&mut **handler),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Request;
    use crate::handler::ControlRequest;

    struct Counting {
        setups: usize,
    }

    impl<'b> ControlHandler<'b> for Counting {
        fn setup(&mut self, _req: &Request) -> ControlRequest<'b> {
            self.setups += 1;
            ControlRequest::no_data()
        }

        fn in_acknowledged(&mut self) {}

        fn out_received(&mut self) -> bool {
            true
        }

        fn out_acknowledged(&mut self) {}
    }

    fn setup_no_data(_req: &Request) -> ControlRequest<'static> {
        ControlRequest::no_data()
    }

    fn nop() {}

    #[test]
    fn lookup_by_request_type() {
        let mut class = Counting { setups: 0 };
        let mut registry = HandlerRegistry::new();
        let req = Request::from_bytes(&[0x21, 0, 0, 0, 0, 0, 0, 0]);

        registry.register(RequestType::Class, &mut class);

        assert!(registry.get(RequestType::Class).is_some());
        assert!(registry.get(RequestType::Standard).is_none());
        assert!(registry.get(RequestType::Vendor).is_none());
        assert!(registry.get(RequestType::Class).unwrap().setup(&req).is_valid());

        drop(registry);
        assert_eq!(class.setups, 1);
    }

    #[test]
    fn last_registration_wins() {
        let mut first = Counting { setups: 0 };
        let mut second = Counting { setups: 0 };
        let req = Request::from_bytes(&[0x40, 0, 0, 0, 0, 0, 0, 0]);

        {
            let mut registry = HandlerRegistry::new();
            registry.register(RequestType::Vendor, &mut first);
            registry.register(RequestType::Vendor, &mut second);
            registry.get(RequestType::Vendor).unwrap().setup(&req);
        }

        assert_eq!(first.setups, 0);
        assert_eq!(second.setups, 1);
    }

    #[test]
    #[should_panic(expected = "reserved")]
    fn reserved_request_type_cannot_be_registered() {
        let mut handler = Counting { setups: 0 };
        let mut registry = HandlerRegistry::new();

        registry.register(RequestType::Reserved, &mut handler);
    }

    #[test]
    #[should_panic(expected = "incomplete control request handler set")]
    fn incomplete_callbacks_are_fatal() {
        let mut callbacks = Callbacks::new();
        callbacks.setup = Some(setup_no_data);
        callbacks.in_acknowledged = Some(nop);
        callbacks.out_acknowledged = Some(nop);

        let mut registry = HandlerRegistry::new();
        registry.register_callbacks(RequestType::Standard, &mut callbacks);
    }

    #[test]
    fn complete_callbacks_are_registered() {
        fn accept() -> bool {
            true
        }

        let mut callbacks = Callbacks::new();
        callbacks.setup = Some(setup_no_data);
        callbacks.in_acknowledged = Some(nop);
        callbacks.out_received = Some(accept);
        callbacks.out_acknowledged = Some(nop);

        let mut registry = HandlerRegistry::new();
        registry.register_callbacks(RequestType::Standard, &mut callbacks);

        assert!(registry.get(RequestType::Standard).unwrap().out_received());
    }
}
