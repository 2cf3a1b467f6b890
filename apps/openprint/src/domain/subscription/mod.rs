//! Subscription Planning
//!
//! Decides what the session subscribes to and whether the per-symbol
//! unsubscribe feedback loop is available.
//!
//! # Design
//!
//! The configured symbol list is either explicit tickers or the wildcard
//! sentinel `*` meaning "every symbol currently tradable on the feed". A
//! wildcard subscription cannot be narrowed symbol-by-symbol, so the
//! unsubscribe loop only runs for explicit lists; the wildcard plan is the
//! same event processor with that capability absent.

use std::collections::HashSet;

/// Approximate number of symbols on the full SIP feed.
///
/// Sizing hint for dedup tables and handoff queues when subscribing with
/// the wildcard; not a hard limit.
pub const DEFAULT_SIP_SYMBOL_COUNT: usize = 13_000;

/// Sentinel symbol meaning "every symbol currently tradable on the feed".
pub const WILDCARD: &str = "*";

/// What the watcher subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionPlan {
    /// Subscribe to every tradable symbol.
    AllSymbols,
    /// Subscribe to a fixed list of symbols.
    Explicit(Vec<String>),
}

impl SubscriptionPlan {
    /// Build a plan from a configured symbol list.
    ///
    /// The wildcard sentinel anywhere in the list means "all symbols".
    /// Duplicates in an explicit list are collapsed, keeping first
    /// appearance order.
    #[must_use]
    pub fn from_symbols(symbols: Vec<String>) -> Self {
        if symbols.iter().any(|s| s == WILDCARD) {
            return Self::AllSymbols;
        }

        let mut seen = HashSet::new();
        let deduped = symbols
            .into_iter()
            .filter(|symbol| seen.insert(symbol.clone()))
            .collect();
        Self::Explicit(deduped)
    }

    /// Symbols to place in the subscribe request.
    #[must_use]
    pub fn subscribe_symbols(&self) -> Vec<String> {
        match self {
            Self::AllSymbols => vec![WILDCARD.to_string()],
            Self::Explicit(symbols) => symbols.clone(),
        }
    }

    /// Expected symbol cardinality, for sizing tables and queues.
    #[must_use]
    pub fn capacity_hint(&self) -> usize {
        match self {
            Self::AllSymbols => DEFAULT_SIP_SYMBOL_COUNT,
            Self::Explicit(symbols) => symbols.len(),
        }
    }

    /// Whether the unsubscribe-on-first-match feedback loop is available.
    #[must_use]
    pub const fn supports_unsubscribe(&self) -> bool {
        matches!(self, Self::Explicit(_))
    }

    /// Whether this plan subscribes to the whole feed.
    #[must_use]
    pub const fn is_all_symbols(&self) -> bool {
        matches!(self, Self::AllSymbols)
    }

    /// Whether the plan subscribes to nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Explicit(symbols) if symbols.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn explicit_list_stays_explicit() {
        let plan = SubscriptionPlan::from_symbols(symbols(&["AAPL", "MSFT"]));
        assert_eq!(plan.subscribe_symbols(), symbols(&["AAPL", "MSFT"]));
        assert!(plan.supports_unsubscribe());
        assert!(!plan.is_all_symbols());
        assert_eq!(plan.capacity_hint(), 2);
    }

    #[test]
    fn wildcard_anywhere_means_all_symbols() {
        let plan = SubscriptionPlan::from_symbols(symbols(&["AAPL", "*", "MSFT"]));
        assert!(plan.is_all_symbols());
        assert_eq!(plan.subscribe_symbols(), symbols(&["*"]));
        assert!(!plan.supports_unsubscribe());
        assert_eq!(plan.capacity_hint(), DEFAULT_SIP_SYMBOL_COUNT);
    }

    #[test]
    fn duplicates_collapse_in_order() {
        let plan = SubscriptionPlan::from_symbols(symbols(&["AAPL", "MSFT", "AAPL"]));
        assert_eq!(plan.subscribe_symbols(), symbols(&["AAPL", "MSFT"]));
    }

    #[test]
    fn empty_list_is_empty_plan() {
        let plan = SubscriptionPlan::from_symbols(vec![]);
        assert!(plan.is_empty());
        assert!(plan.subscribe_symbols().is_empty());
    }

    #[test]
    fn all_symbols_plan_is_never_empty() {
        let plan = SubscriptionPlan::from_symbols(symbols(&["*"]));
        assert!(!plan.is_empty());
    }
}
