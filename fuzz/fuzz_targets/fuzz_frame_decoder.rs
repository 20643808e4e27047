//! Fuzz target: `FrameDecoder::next_frame`
//!
//! Feeds arbitrary bytes in two pieces and drains the decoder.  It must
//! never panic, never yield an empty or oversized payload, and must stop
//! at the first framing error.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaybox::rpc::codec::{FrameDecoder, MAX_FRAME_SIZE};

fuzz_target!(|data: &[u8]| {
    let split = data.first().map_or(0, |b| *b as usize % (data.len() + 1));
    let mut decoder = FrameDecoder::new();

    for chunk in [&data[..split], &data[split..]] {
        decoder.push(chunk);
        loop {
            match decoder.next_frame() {
                Ok(Some(payload)) => {
                    assert!(!payload.is_empty(), "decoder yielded an empty payload");
                    assert!(payload.len() <= MAX_FRAME_SIZE, "payload exceeds MAX_FRAME_SIZE");
                }
                Ok(None) => break,
                Err(_) => {
                    decoder.reset();
                    assert_eq!(decoder.buffered(), 0);
                    return;
                }
            }
        }
    }
});
