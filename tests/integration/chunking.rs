use std::time::Instant;

use chirplink_core::config::TransportConfig;
use chirplink_core::frame::Message;
use chirplink_proto::{Absorbed, Framer, ParseResult, ReassemblyTable};

fn random_printable_ascii(len: usize, mut seed: u64) -> String {
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let c = 0x20 + (seed % 95) as u8;
        out.push(c as char);
    }
    out
}

#[test]
fn fast_path_preserves_exact_message() {
    let config = TransportConfig::default();
    let framer = Framer::new(&config);
    let message = Message::new("abc1234", "hello");

    let frames = framer.split(&message);
    assert_eq!(frames.len(), 1);

    let map = match serde_json::from_str(&frames[0]).unwrap() {
        serde_json::Value::Object(m) => m,
        _ => panic!("frame must be a JSON object"),
    };
    match framer.parse(map).unwrap() {
        ParseResult::Single { message: parsed } => assert_eq!(parsed, message),
        other => panic!("expected Single, got {other:?}"),
    }
}

#[test]
fn chunking_round_trip_survives_any_delivery_permutation() {
    let config = TransportConfig::default();
    let framer = Framer::new(&config);
    let content = random_printable_ascii(5000, 0x1234_5678_9abc_def0);
    let message = Message::new("abc1234", content.clone());

    let frames = framer.split(&message);
    assert!(frames.len() > 1, "5000 chars should force chunking");
    for frame in &frames {
        assert!(frame.len() <= config.frame_limit);
    }

    // Deliver in reverse order, then a duplicate of the first piece, to
    // exercise both out-of-order and duplicate-tolerant absorption.
    let mut delivery: Vec<&String> = frames.iter().rev().collect();
    delivery.push(&frames[0]);

    let mut table = ReassemblyTable::new(64, config.decompress_ceiling);
    let mut completed = None;
    for frame in delivery {
        let map = match serde_json::from_str(frame).unwrap() {
            serde_json::Value::Object(m) => m,
            _ => panic!("frame must be a JSON object"),
        };
        if let ParseResult::ChunkPiece { id, ci, cc, ct, meta } = framer.parse(map).unwrap() {
            if let Absorbed::Complete(msg) = table.absorb(id, ci, cc, ct, meta, Instant::now()) {
                completed = Some(msg);
            }
        }
    }

    let message_out = completed.expect("reassembly should complete");
    assert_eq!(message_out.id, "abc1234");
    assert_eq!(message_out.ct, content);
}

#[test]
fn decompression_bomb_guard_caps_reassembled_output() {
    // A highly repetitive payload compresses to a small wire size but would
    // expand far past a tiny ceiling if unconstrained.
    let huge = "a".repeat(10 * 1024 * 1024);
    let compressed = chirplink_codec::compress(huge.as_bytes());
    let ceiling = 1024;
    let result = chirplink_codec::decompress(&compressed, ceiling);
    let out = result.expect("a truncated decode is not itself an error");
    assert!(out.len() <= ceiling);
}
