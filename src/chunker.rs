use crate::handler::ControlBuffer;
use core::cell::Cell;
use core::cmp::min;
use core::mem;

/// Largest endpoint zero packet size supported by USB.
pub(crate) const MAX_PACKET_SIZE: usize = 64;

/// Splits the data stage of an IN transfer into packets.
pub(crate) struct InChunker<'b> {
    buf: ControlBuffer<'b>,
    pos: usize,
    remaining: usize,
    max_packet_size: usize,
    zlp_owed: bool,
}

impl<'b> InChunker<'b> {
    /// A transfer that ends on a packet boundary before reaching the length the host asked for
    /// must be terminated with a zero-length packet.
    pub fn new(buf: ControlBuffer<'b>, requested: usize, max_packet_size: usize) -> Self {
        let remaining = buf.len();

        InChunker {
            buf,
            pos: 0,
            remaining,
            max_packet_size,
            zlp_owed: requested > remaining && remaining % max_packet_size == 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Copies the next packet into `packet` and returns its length.
    pub fn next_packet(&mut self, packet: &mut [u8; MAX_PACKET_SIZE]) -> usize {
        let count = min(self.remaining, self.max_packet_size);

        self.buf.copy_to(self.pos, &mut packet[..count]);
        self.pos += count;
        self.remaining -= count;

        if count == 0 {
            // An empty data stage is terminated by its only packet.
            self.zlp_owed = false;
        }

        count
    }

    /// Returns `true` once if a zero-length packet is still owed after the last data packet.
    pub fn take_zlp(&mut self) -> bool {
        self.remaining == 0 && mem::replace(&mut self.zlp_owed, false)
    }
}

/// How a received OUT packet fits into the data stage.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum OutPacket {
    /// A full packet with more data to follow.
    More,
    /// The packet completes the data stage.
    Last,
    /// The packet is shorter or longer than the rest of the data stage.
    Mismatch,
    /// The packet is longer than the endpoint maximum packet size.
    Oversize,
}

/// Collects the data stage of an OUT transfer into the handler buffer.
pub(crate) struct OutAssembler<'b> {
    buf: &'b [Cell<u8>],
    pos: usize,
    max_packet_size: usize,
}

impl<'b> OutAssembler<'b> {
    pub fn new(buf: &'b [Cell<u8>], max_packet_size: usize) -> Self {
        OutAssembler {
            buf,
            pos: 0,
            max_packet_size,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn classify(&self, count: usize) -> OutPacket {
        let remaining = self.remaining();

        if count > self.max_packet_size {
            OutPacket::Oversize
        } else if count == self.max_packet_size && count < remaining {
            OutPacket::More
        } else if count == remaining {
            OutPacket::Last
        } else {
            OutPacket::Mismatch
        }
    }

    /// Appends `data` at the cursor. `data` must fit in the remaining space.
    pub fn store(&mut self, data: &[u8]) {
        for (c, d) in self.buf[self.pos..self.pos + data.len()].iter().zip(data) {
            c.set(*d);
        }

        self.pos += data.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_packets(len: usize, requested: usize, max_packet_size: usize) -> (usize, bool) {
        let data = [0xa5u8; 256];
        let mut chunker = InChunker::new(
            ControlBuffer::from(&data[..len]),
            requested,
            max_packet_size,
        );
        let mut packet = [0u8; MAX_PACKET_SIZE];

        let mut packets = 1;
        chunker.next_packet(&mut packet);

        while chunker.remaining() > 0 {
            chunker.next_packet(&mut packet);
            packets += 1;
        }

        let zlp = chunker.take_zlp();
        assert!(!chunker.take_zlp(), "zero-length packet owed twice");

        (packets + zlp as usize, zlp)
    }

    #[test]
    fn full_packet_short_of_request_needs_zlp() {
        assert_eq!(count_packets(64, 128, 64), (2, true));
    }

    #[test]
    fn full_packet_matching_request_has_no_zlp() {
        assert_eq!(count_packets(64, 64, 64), (1, false));
    }

    #[test]
    fn short_packet_terminates_transfer() {
        assert_eq!(count_packets(40, 100, 64), (1, false));
    }

    #[test]
    fn multi_packet_transfers() {
        assert_eq!(count_packets(18, 255, 8), (3, false));
        assert_eq!(count_packets(16, 255, 8), (3, true));
        assert_eq!(count_packets(16, 16, 8), (2, false));
        assert_eq!(count_packets(130, 200, 64), (3, false));
    }

    #[test]
    fn empty_data_stage_sends_single_packet() {
        assert_eq!(count_packets(0, 64, 64), (1, false));
    }

    #[test]
    fn packets_carry_buffer_contents_in_order() {
        let data: [u8; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut chunker = InChunker::new(ControlBuffer::from(&data), 10, 8);
        let mut packet = [0u8; MAX_PACKET_SIZE];

        assert_eq!(chunker.next_packet(&mut packet), 8);
        assert_eq!(&packet[..8], &data[..8]);
        assert_eq!(chunker.next_packet(&mut packet), 2);
        assert_eq!(&packet[..2], &[8, 9]);
        assert_eq!(chunker.remaining(), 0);
    }

    #[test]
    fn out_classification() {
        let mut storage = [0u8; 20];
        let cells = Cell::from_mut(&mut storage[..]).as_slice_of_cells();
        let mut out = OutAssembler::new(cells, 8);

        assert_eq!(out.classify(9), OutPacket::Oversize);
        assert_eq!(out.classify(8), OutPacket::More);
        assert_eq!(out.classify(4), OutPacket::Mismatch);

        out.store(&[1; 8]);
        out.store(&[2; 8]);
        assert_eq!(out.remaining(), 4);

        assert_eq!(out.classify(4), OutPacket::Last);
        assert_eq!(out.classify(3), OutPacket::Mismatch);
        assert_eq!(out.classify(8), OutPacket::Mismatch);
    }

    #[test]
    fn out_final_full_packet() {
        let mut storage = [0u8; 8];
        let cells = Cell::from_mut(&mut storage[..]).as_slice_of_cells();
        let out = OutAssembler::new(cells, 8);

        assert_eq!(out.classify(8), OutPacket::Last);
    }

    #[test]
    fn out_data_lands_in_handler_buffer() {
        let mut storage = [0u8; 6];
        {
            let cells = Cell::from_mut(&mut storage[..]).as_slice_of_cells();
            let mut out = OutAssembler::new(cells, 4);
            out.store(&[1, 2, 3, 4]);
            out.store(&[5, 6]);
        }

        assert_eq!(storage, [1, 2, 3, 4, 5, 6]);
    }
}
