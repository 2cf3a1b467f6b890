//! Opening-Print Detection
//!
//! The core state machine of the watcher. For a serial stream of trades it
//! decides which ones are a symbol's first opening print of the trading
//! day, composing three small pieces:
//!
//! - a condition-code filter (the hot-path rejection test),
//! - a day-window tracker that detects trading-day rollover,
//! - a per-day dedup table enforcing at-most-once emission per symbol.
//!
//! All state lives in one [`OpeningPrintDetector`] instance owned by the
//! event-delivery task; processing is a plain `&mut` call and events are
//! delivered strictly one at a time, so no locking is involved.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::trade::Trade;

/// Condition code marking a session's official opening print.
pub const OPENING_CONDITION: &str = "O";

/// Check whether a trade's condition codes mark it as an opening print.
///
/// Exact, case-sensitive match anywhere in the sequence. Duplicate codes
/// are harmless and an empty sequence never matches.
#[must_use]
pub fn is_opening_trade(conditions: &[String]) -> bool {
    conditions.iter().any(|c| c == OPENING_CONDITION)
}

// =============================================================================
// Day Window
// =============================================================================

/// Tracks the current trading-day window.
///
/// The trading day is the UTC calendar date of the trade timestamp, which
/// is the feed's native epoch. The same boundary must be used everywhere in
/// the process: mixing boundaries would split one trading day into two
/// dedup windows.
///
/// The marker only ever moves forward. A late event carrying an earlier
/// timestamp must not reopen a previous day, so the comparison is strictly
/// `day > marker`, never `day != marker`.
#[derive(Debug, Default)]
pub struct DayWindow {
    current: Option<NaiveDate>,
}

impl DayWindow {
    /// Create a tracker with no day observed yet. The first trade observed
    /// always starts a new day.
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// The current trading day, once any trade has been observed.
    #[must_use]
    pub const fn current(&self) -> Option<NaiveDate> {
        self.current
    }

    /// Observe a trade timestamp.
    ///
    /// Returns `true` and advances the marker when the timestamp falls on a
    /// strictly later day than the stored marker; the caller must then
    /// reset any day-scoped state.
    pub fn observe(&mut self, timestamp: DateTime<Utc>) -> bool {
        let day = timestamp.date_naive();
        if self.current.is_none_or(|marker| day > marker) {
            self.current = Some(day);
            true
        } else {
            false
        }
    }
}

// =============================================================================
// Per-Day Dedup
// =============================================================================

/// Per-day record of symbols whose opening print has already been emitted.
///
/// Invariant: contains a symbol if and only if an opening print for that
/// symbol has been emitted during the current trading day.
#[derive(Debug)]
pub struct OpeningDedup {
    seen: HashSet<String>,
    capacity: usize,
}

impl OpeningDedup {
    /// Create a dedup table pre-sized for the expected symbol universe.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Discard all entries for a fresh trading day.
    ///
    /// The table is replaced, not drained, and keeps its original sizing.
    pub fn reset(&mut self) {
        self.seen = HashSet::with_capacity(self.capacity);
    }

    /// Record `symbol` if it has not produced an opening print today.
    ///
    /// Returns `true` exactly once per symbol per trading day.
    pub fn mark_if_first(&mut self, symbol: &str) -> bool {
        if self.seen.contains(symbol) {
            false
        } else {
            self.seen.insert(symbol.to_owned());
            true
        }
    }

    /// Number of symbols recorded for the current day.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no symbol has been recorded for the current day.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

// =============================================================================
// Opening Print Record
// =============================================================================

/// The emitted artifact: a projection of the trade that opened a symbol's
/// session.
///
/// Written once per (symbol, trading day) pair, never mutated or retracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpeningPrint {
    /// Ticker symbol.
    pub symbol: String,
    /// Execution timestamp of the opening trade.
    pub timestamp: DateTime<Utc>,
    /// Condition codes carried by the opening trade.
    pub conditions: Vec<String>,
    /// Execution price.
    pub price: Decimal,
    /// Trade size in shares.
    pub size: u32,
    /// Exchange code where the trade executed.
    pub exchange: String,
    /// Reporting tape.
    pub tape: String,
    /// Feed-assigned trade identifier, when present.
    pub trade_id: Option<i64>,
}

impl From<&Trade> for OpeningPrint {
    fn from(trade: &Trade) -> Self {
        Self {
            symbol: trade.symbol.clone(),
            timestamp: trade.timestamp,
            conditions: trade.conditions.clone(),
            price: trade.price,
            size: trade.size,
            exchange: trade.exchange.clone(),
            tape: trade.tape.clone(),
            trade_id: trade.trade_id,
        }
    }
}

// =============================================================================
// Detector
// =============================================================================

/// Composes the filter, day window, and dedup table into the per-event
/// state transition.
///
/// Constructed once at startup and owned by the single event-delivery task.
#[derive(Debug)]
pub struct OpeningPrintDetector {
    day: DayWindow,
    seen: OpeningDedup,
}

impl OpeningPrintDetector {
    /// Create a detector sized for the expected symbol universe.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            day: DayWindow::new(),
            seen: OpeningDedup::with_capacity(capacity),
        }
    }

    /// Process one trade.
    ///
    /// Returns the opening print when this is the symbol's first qualifying
    /// trade of the trading day, `None` otherwise. Non-opening trades are
    /// rejected before any state is touched; the overwhelming majority of
    /// the stream takes that path.
    pub fn process(&mut self, trade: &Trade) -> Option<OpeningPrint> {
        if !is_opening_trade(&trade.conditions) {
            return None;
        }

        if self.day.observe(trade.timestamp) {
            tracing::info!(day = %trade.timestamp.date_naive(), "starting new trading day");
            self.seen.reset();
        }

        if !self.seen.mark_if_first(&trade.symbol) {
            return None;
        }

        Some(OpeningPrint::from(trade))
    }

    /// The trading day currently in effect, once any opening trade has been
    /// observed.
    #[must_use]
    pub const fn current_day(&self) -> Option<NaiveDate> {
        self.day.current()
    }

    /// Number of symbols that have produced an opening print today.
    #[must_use]
    pub fn prints_today(&self) -> usize {
        self.seen.len()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    fn trade(symbol: &str, timestamp: &str, conditions: &[&str]) -> Trade {
        Trade {
            symbol: symbol.to_string(),
            timestamp: timestamp.parse().unwrap(),
            conditions: conditions.iter().map(ToString::to_string).collect(),
            price: Decimal::new(12655, 2),
            size: 100,
            exchange: "N".to_string(),
            tape: "A".to_string(),
            trade_id: Some(96921),
        }
    }

    #[test_case(&[] => false; "empty sequence")]
    #[test_case(&["O"] => true; "opening only")]
    #[test_case(&["R", "O"] => true; "opening among others")]
    #[test_case(&["O", "O"] => true; "duplicate opening codes")]
    #[test_case(&["R"] => false; "no opening code")]
    #[test_case(&["o"] => false; "case sensitive")]
    #[test_case(&["@", "I"] => false; "regular sale conditions")]
    fn filter_matches_opening_condition(conditions: &[&str]) -> bool {
        let conditions: Vec<String> = conditions.iter().map(ToString::to_string).collect();
        is_opening_trade(&conditions)
    }

    #[test]
    fn day_window_first_observation_is_new_day() {
        let mut window = DayWindow::new();
        assert!(window.current().is_none());

        assert!(window.observe("2024-03-11T14:30:00Z".parse().unwrap()));
        assert_eq!(
            window.current(),
            Some("2024-03-11".parse::<NaiveDate>().unwrap())
        );
    }

    #[test]
    fn day_window_same_day_does_not_reset() {
        let mut window = DayWindow::new();
        assert!(window.observe("2024-03-11T09:30:00Z".parse().unwrap()));
        assert!(!window.observe("2024-03-11T15:45:00Z".parse().unwrap()));
        assert!(!window.observe("2024-03-11T23:59:59.999999999Z".parse().unwrap()));
    }

    #[test]
    fn day_window_later_day_resets() {
        let mut window = DayWindow::new();
        assert!(window.observe("2024-03-11T23:59:59Z".parse().unwrap()));
        assert!(window.observe("2024-03-12T00:00:00Z".parse().unwrap()));
        assert_eq!(
            window.current(),
            Some("2024-03-12".parse::<NaiveDate>().unwrap())
        );
    }

    #[test]
    fn day_window_earlier_timestamp_never_resets() {
        let mut window = DayWindow::new();
        assert!(window.observe("2024-03-12T09:30:00Z".parse().unwrap()));

        // Late-arriving event from the previous day: no reset, marker keeps
        // the newer day.
        assert!(!window.observe("2024-03-11T15:00:00Z".parse().unwrap()));
        assert_eq!(
            window.current(),
            Some("2024-03-12".parse::<NaiveDate>().unwrap())
        );
    }

    #[test]
    fn day_window_skipped_days_advance() {
        // Weekend gap: Friday straight to Monday.
        let mut window = DayWindow::new();
        assert!(window.observe("2024-03-08T20:00:00Z".parse().unwrap()));
        assert!(window.observe("2024-03-11T09:30:00Z".parse().unwrap()));
    }

    #[test]
    fn dedup_marks_each_symbol_once() {
        let mut dedup = OpeningDedup::with_capacity(8);
        assert!(dedup.is_empty());

        assert!(dedup.mark_if_first("AAPL"));
        assert!(!dedup.mark_if_first("AAPL"));
        assert!(dedup.mark_if_first("MSFT"));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn dedup_reset_forgets_everything() {
        let mut dedup = OpeningDedup::with_capacity(8);
        assert!(dedup.mark_if_first("AAPL"));

        dedup.reset();
        assert!(dedup.is_empty());
        assert!(dedup.mark_if_first("AAPL"));
    }

    #[test]
    fn dedup_empty_symbol_is_a_key_like_any_other() {
        let mut dedup = OpeningDedup::with_capacity(8);
        assert!(dedup.mark_if_first(""));
        assert!(!dedup.mark_if_first(""));
    }

    // Scenario A: repeated opening trades for the same symbol on one day
    // produce exactly one record, for the first event only.
    #[test]
    fn scenario_repeat_opening_trades_emit_once() {
        let mut detector = OpeningPrintDetector::new(8);

        let first = detector.process(&trade("AAPL", "2024-03-11T14:30:00.000000001Z", &["O"]));
        let second = detector.process(&trade("AAPL", "2024-03-11T14:30:05Z", &["O"]));
        let third = detector.process(&trade("AAPL", "2024-03-11T14:31:00Z", &[]));

        let print = first.expect("first opening trade must emit");
        assert_eq!(print.symbol, "AAPL");
        assert_eq!(
            print.timestamp,
            "2024-03-11T14:30:00.000000001Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert!(second.is_none());
        assert!(third.is_none());
    }

    // Scenario B: one record per day across a rollover.
    #[test]
    fn scenario_rollover_emits_again_next_day() {
        let mut detector = OpeningPrintDetector::new(8);

        let day1 = detector.process(&trade("AAPL", "2024-03-11T14:30:00Z", &["O"]));
        let day2 = detector.process(&trade("AAPL", "2024-03-12T14:30:00Z", &["O"]));

        assert!(day1.is_some());
        assert!(day2.is_some());
        assert_eq!(detector.prints_today(), 1);
    }

    // Scenario C: the opening code counts when buried among other codes.
    #[test]
    fn scenario_opening_code_among_others() {
        let mut detector = OpeningPrintDetector::new(8);
        let print = detector.process(&trade("MSFT", "2024-03-11T14:30:00Z", &["R", "O"]));
        assert!(print.is_some());
    }

    // Scenario D: no opening code, no record, no state touched.
    #[test]
    fn scenario_non_opening_trade_is_inert() {
        let mut detector = OpeningPrintDetector::new(8);
        let print = detector.process(&trade("GOOG", "2024-03-11T14:30:00Z", &["R"]));

        assert!(print.is_none());
        assert!(detector.current_day().is_none());
        assert_eq!(detector.prints_today(), 0);

        // The symbol is still eligible for its real opening print.
        assert!(
            detector
                .process(&trade("GOOG", "2024-03-11T14:30:01Z", &["O"]))
                .is_some()
        );
    }

    // A late-arriving previous-day event must neither trigger a rollover
    // nor bypass the dedup state in effect.
    #[test]
    fn late_previous_day_event_does_not_reopen_the_day() {
        let mut detector = OpeningPrintDetector::new(8);

        assert!(
            detector
                .process(&trade("AAPL", "2024-03-11T14:30:00Z", &["O"]))
                .is_some()
        );
        assert!(
            detector
                .process(&trade("AAPL", "2024-03-12T14:30:00Z", &["O"]))
                .is_some()
        );

        // Straggler still timestamped on day one: suppressed, and the day
        // marker stays on day two.
        assert!(
            detector
                .process(&trade("AAPL", "2024-03-11T20:00:00Z", &["O"]))
                .is_none()
        );
        assert_eq!(
            detector.current_day(),
            Some("2024-03-12".parse::<NaiveDate>().unwrap())
        );

        // And other symbols keep deduping against the current day.
        assert!(
            detector
                .process(&trade("MSFT", "2024-03-12T14:35:00Z", &["O"]))
                .is_some()
        );
        assert!(
            detector
                .process(&trade("MSFT", "2024-03-12T14:36:00Z", &["O"]))
                .is_none()
        );
    }

    #[test]
    fn record_projects_all_trade_fields() {
        let mut detector = OpeningPrintDetector::new(8);
        let event = trade("AAPL", "2024-03-11T14:30:00Z", &["O", "Q"]);

        let print = detector.process(&event).expect("must emit");
        assert_eq!(print.symbol, event.symbol);
        assert_eq!(print.timestamp, event.timestamp);
        assert_eq!(print.conditions, event.conditions);
        assert_eq!(print.price, event.price);
        assert_eq!(print.size, event.size);
        assert_eq!(print.exchange, event.exchange);
        assert_eq!(print.tape, event.tape);
        assert_eq!(print.trade_id, event.trade_id);
    }

    proptest! {
        // At-most-once, generalized: over any same-day multiset of opening
        // trades, the emitted symbols are exactly the distinct input symbols.
        #[test]
        fn emits_each_symbol_exactly_once_per_day(
            symbols in proptest::collection::vec("[A-Z]{1,4}", 1..64)
        ) {
            let mut detector = OpeningPrintDetector::new(16);
            let mut emitted = HashSet::new();

            for (i, symbol) in symbols.iter().enumerate() {
                let timestamp = Utc
                    .with_ymd_and_hms(2024, 3, 11, 14, 30, 0)
                    .unwrap()
                    + chrono::TimeDelta::seconds(i64::try_from(i).unwrap());
                let event = Trade {
                    symbol: symbol.clone(),
                    timestamp,
                    conditions: vec![OPENING_CONDITION.to_string()],
                    price: Decimal::new(100, 0),
                    size: 1,
                    exchange: "N".to_string(),
                    tape: "A".to_string(),
                    trade_id: None,
                };
                if let Some(print) = detector.process(&event) {
                    prop_assert!(emitted.insert(print.symbol), "symbol emitted twice");
                }
            }

            let distinct: HashSet<String> = symbols.into_iter().collect();
            prop_assert_eq!(emitted, distinct);
        }
    }
}
