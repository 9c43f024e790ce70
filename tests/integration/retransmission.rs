use std::time::{Duration, Instant};

use chirplink_core::config::TransportConfig;
use chirplink_core::error::TransportError;
use chirplink_core::frame::Message;
use chirplink_proto::{Framer, LastSentCache, ReassemblyTable, RetransmissionController};

#[test]
fn timeout_triggers_exactly_one_retx_and_resets_clock() {
    let config = TransportConfig::default();
    let mut table = ReassemblyTable::new(config.reassembly_table_cap, config.decompress_ceiling);
    let mut controller = RetransmissionController::new(Duration::from_secs(0));

    let start = Instant::now();
    table.absorb("id00001".into(), 0, 4, "a".into(), Some(serde_json::Map::new()), start);
    table.absorb("id00001".into(), 2, 4, "c".into(), None, start);

    let past_timeout = start + config.reassembly_timeout() + Duration::from_secs(1);
    let frames = controller.sweep(&mut table, &config, past_timeout);
    assert_eq!(frames.len(), 1);

    let parsed: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(parsed["fn"], "retx");
    assert_eq!(parsed["ci"], serde_json::json!([1, 3]));

    let timed_out_again = table.timed_out(config.reassembly_timeout(), past_timeout);
    assert!(
        timed_out_again.is_empty(),
        "clock should have been reset after the retx was emitted"
    );
}

#[test]
fn retx_reemits_exact_stored_frame_byte_for_byte() {
    let config = TransportConfig::default();
    let framer = Framer::new(&config);
    let message = Message::new("abc1234", "x".repeat(500));
    let frames = framer.split(&message);
    assert!(frames.len() >= 3);

    let mut cache = LastSentCache::new(config.last_sent_cache_cap);
    cache.insert("abc1234".into(), frames.clone());

    let controller = RetransmissionController::new(config.sweep_interval());
    let resent = controller.honour_retx("abc1234", &[1], &cache).unwrap();
    assert_eq!(resent, vec![frames[1].clone()]);
}

#[test]
fn last_sent_cache_eviction_makes_retx_stale() {
    let config = TransportConfig::default();
    let mut cache = LastSentCache::new(config.last_sent_cache_cap);
    let controller = RetransmissionController::new(config.sweep_interval());

    for i in 0..config.last_sent_cache_cap + 1 {
        let id = format!("id{i:05}");
        cache.insert(id, vec!["frame".to_string()]);
    }

    // The very first id inserted should have been evicted by now.
    let evicted_id = "id00000";
    let err = controller.honour_retx(evicted_id, &[0], &cache).unwrap_err();
    assert!(matches!(err, TransportError::StaleRetx(_)));

    // The most recently inserted id should still be present.
    let newest_id = format!("id{:05}", config.last_sent_cache_cap);
    assert!(cache.contains(&newest_id));
}
