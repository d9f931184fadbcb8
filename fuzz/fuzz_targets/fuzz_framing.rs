#![no_main]

use libfuzzer_sys::fuzz_target;
use message_dispatch::core::message::OutgoingMessage;
use message_dispatch::core::MAX_PAYLOAD_SIZE;

fuzz_target!(|data: &[u8]| {
    // First byte picks checksum on/off, the rest is fed as variable-size writes
    let Some((&flags, mut rest)) = data.split_first() else {
        return;
    };

    let mut msg = OutgoingMessage::new();
    let mut written = Vec::new();
    while let Some((&size, tail)) = rest.split_first() {
        let take = (size as usize * 97).min(tail.len());
        let (chunk, next) = tail.split_at(take);
        // Oversized chunks are allowed to fail but must not change state
        if msg.write(chunk).is_ok() {
            written.extend_from_slice(chunk);
        }
        assert_eq!(msg.payload(), &written[..]);
        rest = next;
    }
    assert!(written.len() <= MAX_PAYLOAD_SIZE);

    let with_checksum = flags & 1 == 1;
    msg.finalize_framing(with_checksum, 0x1234_5678).unwrap();

    let out = msg.output_buffer();
    let offset = if with_checksum { 4 } else { 0 };
    let len = u16::from_le_bytes([out[offset], out[offset + 1]]) as usize;
    assert_eq!(len, written.len() + offset);
    assert_eq!(&out[offset + 2..], &written[..]);
});
