//! Opening-Print Detection Integration Tests
//!
//! Feeds captured wire frames through the codec, the wire-to-domain
//! conversion, and the detector: the same path the live event loop takes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use openprint::infrastructure::alpaca::codec::JsonCodec;
use openprint::{FeedMessage, OpeningPrint, OpeningPrintDetector, Trade};

/// Build a wire frame holding one trade message.
fn trade_frame(symbol: &str, timestamp: &str, conditions: &[&str]) -> String {
    let conditions = serde_json::to_string(conditions).unwrap();
    format!(
        r#"[{{"T":"t","i":96921,"S":"{symbol}","x":"D","p":126.55,"s":100,"t":"{timestamp}","c":{conditions},"z":"C"}}]"#
    )
}

/// Run raw frames through codec, conversion, and detector; collect the
/// emitted prints.
fn run_frames(frames: &[String]) -> Vec<OpeningPrint> {
    let codec = JsonCodec::new();
    let mut detector = OpeningPrintDetector::new(16);
    let mut prints = Vec::new();

    for frame in frames {
        for message in codec.decode(frame).unwrap() {
            if let FeedMessage::Trade(trade) = message {
                if let Some(print) = detector.process(&Trade::from(trade)) {
                    prints.push(print);
                }
            }
        }
    }

    prints
}

#[test]
fn repeated_opening_trades_emit_one_record() {
    let prints = run_frames(&[
        trade_frame("AAPL", "2024-03-11T14:30:00.000000001Z", &["O"]),
        trade_frame("AAPL", "2024-03-11T14:30:05Z", &["O"]),
        trade_frame("AAPL", "2024-03-11T14:31:00Z", &[]),
    ]);

    assert_eq!(prints.len(), 1);
    assert_eq!(prints[0].symbol, "AAPL");
    assert_eq!(
        prints[0].timestamp.to_rfc3339(),
        "2024-03-11T14:30:00.000000001+00:00"
    );
}

#[test]
fn each_day_emits_its_own_record() {
    let prints = run_frames(&[
        trade_frame("AAPL", "2024-03-11T14:30:00Z", &["O"]),
        trade_frame("AAPL", "2024-03-12T14:30:00Z", &["O"]),
    ]);

    assert_eq!(prints.len(), 2);
    assert_eq!(prints[0].timestamp.date_naive().to_string(), "2024-03-11");
    assert_eq!(prints[1].timestamp.date_naive().to_string(), "2024-03-12");
}

#[test]
fn opening_code_counts_among_other_conditions() {
    let prints = run_frames(&[trade_frame("MSFT", "2024-03-11T14:30:00Z", &["R", "O"])]);
    assert_eq!(prints.len(), 1);
    assert_eq!(prints[0].conditions, vec!["R", "O"]);
}

#[test]
fn non_opening_trades_emit_nothing() {
    let prints = run_frames(&[trade_frame("GOOG", "2024-03-11T14:30:00Z", &["R"])]);
    assert!(prints.is_empty());
}

#[test]
fn late_previous_day_straggler_is_suppressed() {
    let prints = run_frames(&[
        trade_frame("AAPL", "2024-03-11T14:30:00Z", &["O"]),
        trade_frame("MSFT", "2024-03-11T14:30:01Z", &["O"]),
        trade_frame("AAPL", "2024-03-12T14:30:00Z", &["O"]),
        // Still timestamped on day one: neither a rollover nor a record.
        trade_frame("AAPL", "2024-03-11T19:59:00Z", &["O"]),
        // The current day keeps deduping normally afterwards.
        trade_frame("MSFT", "2024-03-12T14:31:00Z", &["O"]),
        trade_frame("MSFT", "2024-03-12T14:32:00Z", &["O"]),
    ]);

    let summary: Vec<(String, String)> = prints
        .iter()
        .map(|p| (p.symbol.clone(), p.timestamp.date_naive().to_string()))
        .collect();

    assert_eq!(
        summary,
        vec![
            ("AAPL".to_string(), "2024-03-11".to_string()),
            ("MSFT".to_string(), "2024-03-11".to_string()),
            ("AAPL".to_string(), "2024-03-12".to_string()),
            ("MSFT".to_string(), "2024-03-12".to_string()),
        ]
    );
}

#[test]
fn mixed_frame_with_control_messages_still_yields_trades() {
    let frames = vec![
        r#"[{"T":"success","msg":"connected"}]"#.to_string(),
        r#"[{"T":"subscription","trades":["AAPL"]}]"#.to_string(),
        trade_frame("AAPL", "2024-03-11T14:30:00Z", &["O"]),
    ];

    let prints = run_frames(&frames);
    assert_eq!(prints.len(), 1);
}

#[test]
fn record_carries_every_wire_field() {
    let prints = run_frames(&[trade_frame("AAPL", "2024-03-11T14:30:00Z", &["O", "Q"])]);

    let print = &prints[0];
    assert_eq!(print.symbol, "AAPL");
    assert_eq!(print.conditions, vec!["O", "Q"]);
    assert_eq!(print.price.to_string(), "126.55");
    assert_eq!(print.size, 100);
    assert_eq!(print.exchange, "D");
    assert_eq!(print.tape, "C");
    assert_eq!(print.trade_id, Some(96921));
}
