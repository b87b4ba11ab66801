mod test_helpers;
use crate::test_helpers::*;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use usb_ctl_req::prelude::*;
use usb_ctl_req::test_class::{
    TestHandler, BUFFER_SIZE, REQ_READ_BUFFER, REQ_STORE_REQUEST, REQ_UNKNOWN, REQ_WRITE_BUFFER,
};

const REQUEST_TYPES: [u8; 7] = [0x40, 0xc0, 0x41, 0x21, 0x60, 0x00, 0x80];
const REQUESTS: [u8; 4] = [REQ_STORE_REQUEST, REQ_READ_BUFFER, REQ_WRITE_BUFFER, REQ_UNKNOWN];

fn random_setup(rng: &mut StdRng) -> [u8; 8] {
    let bm_request_type = REQUEST_TYPES[rng.gen_range(0..REQUEST_TYPES.len())];
    let request = REQUESTS[rng.gen_range(0..REQUESTS.len())];
    let length = if rng.gen_bool(0.3) { 0 } else { rng.gen_range(1..40) };

    setup_packet(bm_request_type, request, rng.gen(), 0, length)
}

/// Feeds random event sequences to a pipe. Whatever the host does, the pipe never panics, the
/// counters never decrease, and a new SETUP packet always starts a working transfer.
#[test]
fn random_event_sequences() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0e0);

    for round in 0..50 {
        let stats = ControlStats::new();
        let mut storage = [0u8; BUFFER_SIZE];
        let mut handler = TestHandler::new(&mut storage);
        let mut vendor_setups = 0;

        {
            let mps = [8u16, 16, 32, 64][round % 4];
            let mut pipe = ControlPipeBuilder::new(MockBus::new(mps), &stats)
                .vendor(&mut handler)
                .build();

            let mut previous = stats.snapshot();

            for _ in 0..200 {
                match rng.gen_range(0..4) {
                    0 => {
                        let packet = random_setup(&mut rng);

                        if packet[0] & 0x60 == 0x40 {
                            vendor_setups += 1;
                        }

                        send_setup(&mut pipe, packet);
                    }
                    1 => pipe.handle_in_complete(),
                    2 => {
                        let count = rng.gen_range(0..=(mps as usize + 2));
                        let data: Vec<u8> = (0..count).map(|_| rng.gen()).collect();
                        send_out(&mut pipe, &data);
                    }
                    _ => pipe.handle_stall_sent(),
                }

                assert_ne!(pipe.state(), ControlState::NoData);
                assert_eq!(pipe.bus().stalled, pipe.state() == ControlState::Stalled);

                let snapshot = stats.snapshot();
                for anomaly in Anomaly::ALL.iter() {
                    assert!(snapshot.get(*anomaly) >= previous.get(*anomaly));
                }
                previous = snapshot;
            }

            vendor_setups += 2;

            let data = [0xa5u8; 33];
            assert!(control_write(
                &mut pipe,
                setup_packet(0x40, REQ_WRITE_BUFFER, 0, 0, data.len() as u16),
                &data
            ));

            let sent = control_read(
                &mut pipe,
                setup_packet(0xc0, REQ_READ_BUFFER, 0, 0, data.len() as u16),
            )
            .expect("read after random events");
            assert_eq!(join(&sent), &data[..]);
            assert_eq!(pipe.state(), ControlState::Idle);
        }

        assert_eq!(handler.calls().setup, vendor_setups);
    }
}
