//! The bit-exact TS multiplexer: converts one H.264 annex-B access unit at
//! a time into 188-byte TS packets and hands 1316-byte datagrams to a sink.
//!
//! This muxer is intentionally synchronous — it never suspends on I/O. The
//! sink closure is expected to enqueue the datagram and return immediately
//! ([`crate::srt::Transport::send`] does exactly that); if the sink blocks,
//! so does the encoder thread calling [`TsMuxer::encode`].

use super::pes::{pts_from_ns, write_pes_header};
use super::types::{
    write_adaptation_field, write_header, AdaptationFieldControl, DATAGRAM_SIZE, PAT_SECTION,
    PID_PAT, PID_PMT, PID_VIDEO, PMT_SECTION, TS_PACKET_SIZE, TS_PAYLOAD_SIZE,
};
use crate::ts::crc::Crc32Mpeg2;
use crate::codec::h264::contains_keyframe;

#[derive(Debug, Default, Clone, Copy)]
struct ContinuityCounters {
    pat: u8,
    pmt: u8,
    video: u8,
}

impl ContinuityCounters {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn advance(counter: &mut u8) -> u8 {
        let current = *counter;
        *counter = (*counter + 1) & 0x0F;
        current
    }
}

/// Converts access units into TS packets, buffering them into 1316-byte
/// datagrams before invoking the sink.
///
/// `F` is the sink: a callable invoked with a read-only borrow of the
/// datagram bytes, valid only for the duration of the call (the muxer
/// reuses and clears its internal buffer immediately afterwards).
pub struct TsMuxer<F: FnMut(&[u8])> {
    sink: F,
    cc: ContinuityCounters,
    buffer: Vec<u8>,
    crc: Crc32Mpeg2,
}

impl<F: FnMut(&[u8])> TsMuxer<F> {
    /// Binds a new muxer to `sink`. Counters and buffer start zeroed.
    pub fn new(sink: F) -> Self {
        Self {
            sink,
            cc: ContinuityCounters::default(),
            buffer: Vec::with_capacity(DATAGRAM_SIZE),
            crc: Crc32Mpeg2::new(),
        }
    }

    /// Zeroes all continuity counters and discards any buffered (unflushed)
    /// packets. Does not touch the sink.
    pub fn reset(&mut self) {
        self.cc.reset();
        self.buffer.clear();
    }

    /// Encodes one access unit: emits a fresh PAT/PMT pair, force-flushes,
    /// then segments `data` into TS packets on the video PID carrying one
    /// PES packet with timestamp `pts_ns`.
    ///
    /// Never fails. Malformed `data` (no start codes, too short to scan)
    /// simply yields a non-keyframe access unit.
    pub fn encode(&mut self, data: &[u8], pts_ns: u64) {
        self.write_pat();
        self.write_pmt();
        self.flush();

        let keyframe = contains_keyframe(data);
        let pts = pts_from_ns(pts_ns);

        let mut payload = Vec::with_capacity(14 + data.len());
        write_pes_header(&mut payload, pts_ns);
        payload.extend_from_slice(data);

        self.write_pes_as_ts_packets(&payload, pts, keyframe);
    }

    fn write_pat(&mut self) {
        let mut packet = Vec::with_capacity(TS_PACKET_SIZE);
        write_header(
            &mut packet,
            PID_PAT,
            true,
            AdaptationFieldControl::PayloadOnly,
            ContinuityCounters::advance(&mut self.cc.pat),
        );
        self.write_psi_payload(&mut packet, &PAT_SECTION);
        self.push_packet(packet);
    }

    fn write_pmt(&mut self) {
        let mut packet = Vec::with_capacity(TS_PACKET_SIZE);
        write_header(
            &mut packet,
            PID_PMT,
            true,
            AdaptationFieldControl::PayloadOnly,
            ContinuityCounters::advance(&mut self.cc.pmt),
        );
        self.write_psi_payload(&mut packet, &PMT_SECTION);
        self.push_packet(packet);
    }

    /// Writes `pointer_field(0x00) || section || crc32 || 0xFF padding` so
    /// the packet (4-byte header already present) reaches exactly 188
    /// bytes.
    fn write_psi_payload(&self, packet: &mut Vec<u8>, section: &[u8]) {
        packet.push(0x00); // pointer_field
        packet.extend_from_slice(section);
        let crc = self.crc.calculate(section);
        packet.extend_from_slice(&crc.to_be_bytes());
        let used = 1 + section.len() + 4;
        packet.extend(std::iter::repeat(0xFFu8).take(TS_PAYLOAD_SIZE - used));
    }

    fn write_pes_as_ts_packets(&mut self, payload: &[u8], pcr_base: u64, keyframe: bool) {
        let mut offset = 0;
        let mut first = true;

        while offset < payload.len() {
            let remaining = payload.len() - offset;

            let (afc, adaptation_len, pcr_present) = if first {
                let min_adaptation = 8; // length + flags + 6-byte PCR
                let adaptation_len = if remaining <= TS_PAYLOAD_SIZE - min_adaptation {
                    TS_PAYLOAD_SIZE - remaining
                } else {
                    min_adaptation
                };
                (
                    AdaptationFieldControl::AdaptationAndPayload,
                    adaptation_len,
                    true,
                )
            } else if remaining >= TS_PAYLOAD_SIZE {
                (AdaptationFieldControl::PayloadOnly, 0, false)
            } else {
                (
                    AdaptationFieldControl::AdaptationAndPayload,
                    TS_PAYLOAD_SIZE - remaining,
                    false,
                )
            };

            let payload_capacity = TS_PAYLOAD_SIZE - adaptation_len;
            let take = payload_capacity.min(remaining);

            let mut packet = Vec::with_capacity(TS_PACKET_SIZE);
            write_header(
                &mut packet,
                PID_VIDEO,
                first,
                afc,
                ContinuityCounters::advance(&mut self.cc.video),
            );
            if adaptation_len > 0 {
                write_adaptation_field(
                    &mut packet,
                    adaptation_len,
                    pcr_present.then_some(pcr_base),
                    first && keyframe,
                );
            }
            packet.extend_from_slice(&payload[offset..offset + take]);
            debug_assert_eq!(packet.len(), TS_PACKET_SIZE);

            self.push_packet(packet);
            offset += take;
            first = false;
        }
    }

    fn push_packet(&mut self, packet: Vec<u8>) {
        debug_assert_eq!(packet.len(), TS_PACKET_SIZE);
        self.buffer.extend_from_slice(&packet);
        if self.buffer.len() == DATAGRAM_SIZE {
            self.flush();
        }
    }

    /// Hands any buffered bytes to the sink and clears the buffer. A no-op
    /// when the buffer is empty.
    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        (self.sink)(&self.buffer);
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn idr_access_unit() -> Vec<u8> {
        let mut data = vec![0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1E];
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x68, 0xCE, 0x38, 0x80]);
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x80]);
        data
    }

    #[test]
    fn single_iframe_emits_pat_pmt_then_pes_packets() {
        let mut datagrams = Vec::new();
        {
            let mut sink = |bytes: &[u8]| datagrams.push(bytes.to_vec());
            let mut muxer = TsMuxer::new(&mut sink);
            muxer.encode(&idr_access_unit(), 0);
        }

        assert!(!datagrams.is_empty());
        let first = &datagrams[0];
        assert!(first.len() % TS_PACKET_SIZE == 0);

        let pat = &first[0..TS_PACKET_SIZE];
        assert_eq!(pat[0], 0x47);
        let pat_pid = (((pat[1] & 0x1F) as u16) << 8) | pat[2] as u16;
        assert_eq!(pat_pid, PID_PAT);

        let pmt = &first[TS_PACKET_SIZE..2 * TS_PACKET_SIZE];
        assert_eq!(pmt[0], 0x47);
        let pmt_pid = (((pmt[1] & 0x1F) as u16) << 8) | pmt[2] as u16;
        assert_eq!(pmt_pid, PID_PMT);

        // PAT/PMT force-flush: the first datagram should not also contain
        // a full 1316-byte run unless the PES itself filled the remainder.
        assert!(first.len() >= 2 * TS_PACKET_SIZE);
    }

    #[test]
    fn keyframe_sets_random_access_indicator() {
        let mut datagrams = Vec::new();
        {
            let mut sink = |bytes: &[u8]| datagrams.push(bytes.to_vec());
            let mut muxer = TsMuxer::new(&mut sink);
            muxer.encode(&idr_access_unit(), 0);
        }
        let all: Vec<u8> = datagrams.concat();
        let video_packet = all
            .chunks(TS_PACKET_SIZE)
            .find(|p| {
                let pid = (((p[1] & 0x1F) as u16) << 8) | p[2] as u16;
                pid == PID_VIDEO
            })
            .expect("a video packet");
        let afc = (video_packet[3] >> 4) & 0x03;
        assert_eq!(afc, 0b11);
        let rai = video_packet[5] & 0x40;
        assert_eq!(rai, 0x40);
    }

    #[test]
    fn non_keyframe_clears_random_access_indicator() {
        let non_idr = [0x00, 0x00, 0x01, 0x41, 0x9A, 0x24];
        let mut datagrams = Vec::new();
        {
            let mut sink = |bytes: &[u8]| datagrams.push(bytes.to_vec());
            let mut muxer = TsMuxer::new(&mut sink);
            muxer.encode(&non_idr, 33_333_333);
        }
        let all: Vec<u8> = datagrams.concat();
        let video_packet = all
            .chunks(TS_PACKET_SIZE)
            .find(|p| {
                let pid = (((p[1] & 0x1F) as u16) << 8) | p[2] as u16;
                pid == PID_VIDEO
            })
            .expect("a video packet");
        let rai = video_packet[5] & 0x40;
        assert_eq!(rai, 0x00);
    }

    #[test]
    fn continuity_counters_advance_independently_per_pid() {
        let mut datagrams = Vec::new();
        {
            let mut sink = |bytes: &[u8]| datagrams.push(bytes.to_vec());
            let mut muxer = TsMuxer::new(&mut sink);
            muxer.encode(&idr_access_unit(), 0);
            muxer.encode(&idr_access_unit(), 33_333_333);
        }
        let all: Vec<u8> = datagrams.concat();
        let pat_ccs: Vec<u8> = all
            .chunks(TS_PACKET_SIZE)
            .filter(|p| (((p[1] & 0x1F) as u16) << 8) | p[2] as u16 == PID_PAT)
            .map(|p| p[3] & 0x0F)
            .collect();
        assert_eq!(pat_ccs, vec![0, 1]);

        let video_ccs: Vec<u8> = all
            .chunks(TS_PACKET_SIZE)
            .filter(|p| (((p[1] & 0x1F) as u16) << 8) | p[2] as u16 == PID_VIDEO)
            .map(|p| p[3] & 0x0F)
            .collect();
        for pair in video_ccs.windows(2) {
            assert_eq!((pair[0] + 1) & 0x0F, pair[1]);
        }
    }

    #[test]
    fn last_packet_stuffing_yields_exactly_two_video_packets() {
        let data = vec![0xAAu8; 200];
        let mut datagrams = Vec::new();
        {
            let mut sink = |bytes: &[u8]| datagrams.push(bytes.to_vec());
            let mut muxer = TsMuxer::new(&mut sink);
            muxer.encode(&data, 0);
        }
        let all: Vec<u8> = datagrams.concat();
        let video_packets: Vec<&[u8]> = all
            .chunks(TS_PACKET_SIZE)
            .filter(|p| (((p[1] & 0x1F) as u16) << 8) | p[2] as u16 == PID_VIDEO)
            .collect();
        assert_eq!(video_packets.len(), 2);
        let last = video_packets[1];
        let afc = (last[3] >> 4) & 0x03;
        assert_eq!(afc, 0b11);
    }

    #[test]
    fn reset_zeroes_counters() {
        let mut datagrams = Vec::new();
        {
            let mut sink = |bytes: &[u8]| datagrams.push(bytes.to_vec());
            let mut muxer = TsMuxer::new(&mut sink);
            muxer.encode(&idr_access_unit(), 0);
            muxer.reset();
            muxer.encode(&idr_access_unit(), 0);
        }
        let all: Vec<u8> = datagrams.concat();
        let pat_ccs: Vec<u8> = all
            .chunks(TS_PACKET_SIZE)
            .filter(|p| (((p[1] & 0x1F) as u16) << 8) | p[2] as u16 == PID_PAT)
            .map(|p| p[3] & 0x0F)
            .collect();
        assert_eq!(pat_ccs, vec![0, 0]);
    }

    #[test]
    fn every_datagram_length_is_a_multiple_of_188() {
        let mut datagrams = Vec::new();
        {
            let mut sink = |bytes: &[u8]| datagrams.push(bytes.to_vec());
            let mut muxer = TsMuxer::new(&mut sink);
            for i in 0..5u64 {
                muxer.encode(&idr_access_unit(), i * 33_333_333);
            }
        }
        for d in &datagrams {
            assert_eq!(d.len() % TS_PACKET_SIZE, 0);
            assert!(d.len() <= DATAGRAM_SIZE);
            assert_eq!(d[0], 0x47);
        }
    }
}
