//! Admission filters
//!
//! A [`FilterChain`] holds named predicates in insertion order and admits a
//! packet only if every predicate does. Evaluation stops at the first
//! rejection; an empty chain admits everything. The chain keeps no counters.

mod rules;

pub use rules::{FilterRule, LengthRange};

use crate::packet::CapturedPacket;
use std::fmt;

/// Named, stateless admission predicate
pub trait FilterPredicate: Send + Sync {
    /// Predicate name for logging
    fn name(&self) -> &str;

    /// `true` to admit the packet
    fn admit(&self, packet: &CapturedPacket) -> bool;
}

/// Predicate backed by a closure
pub struct FnPredicate<F> {
    name: String,
    f: F,
}

impl<F> FilterPredicate for FnPredicate<F>
where
    F: Fn(&CapturedPacket) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn admit(&self, packet: &CapturedPacket) -> bool {
        (self.f)(packet)
    }
}

/// Wrap a closure as a named predicate
pub fn predicate_fn<F>(name: impl Into<String>, f: F) -> FnPredicate<F>
where
    F: Fn(&CapturedPacket) -> bool + Send + Sync,
{
    FnPredicate {
        name: name.into(),
        f,
    }
}

/// A rule with the name it was configured under
pub struct NamedRule {
    name: String,
    rule: FilterRule,
}

impl NamedRule {
    /// Attach a name to a rule
    pub fn new(name: impl Into<String>, rule: FilterRule) -> Self {
        Self {
            name: name.into(),
            rule,
        }
    }
}

impl FilterPredicate for NamedRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn admit(&self, packet: &CapturedPacket) -> bool {
        self.rule.matches(packet)
    }
}

/// Handle returned by [`FilterChain::add`]; never reused within a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(u64);

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter#{}", self.0)
    }
}

/// Ordered list of admission predicates
#[derive(Default)]
pub struct FilterChain {
    entries: Vec<(FilterId, Box<dyn FilterPredicate>)>,
    next_id: u64,
}

impl FilterChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a predicate
    pub fn add<P: FilterPredicate + 'static>(&mut self, predicate: P) -> FilterId {
        self.add_boxed(Box::new(predicate))
    }

    /// Append an already boxed predicate
    pub fn add_boxed(&mut self, predicate: Box<dyn FilterPredicate>) -> FilterId {
        let id = FilterId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, predicate));
        id
    }

    /// Remove a predicate. Unknown or already removed ids are ignored.
    pub fn remove(&mut self, id: FilterId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Check whether every predicate admits the packet
    pub fn admit(&self, packet: &CapturedPacket) -> bool {
        self.entries.iter().all(|(_, p)| p.admit(packet))
    }

    /// First predicate that rejects the packet, if any
    pub fn first_rejection(&self, packet: &CapturedPacket) -> Option<(FilterId, &str)> {
        self.entries
            .iter()
            .find(|(_, p)| !p.admit(packet))
            .map(|(id, p)| (*id, p.name()))
    }

    /// Number of predicates
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Predicate names in evaluation order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(_, p)| p.name()).collect()
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{FrameBuilder, ProtocolTags};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn tcp() -> CapturedPacket {
        CapturedPacket::new(0, FrameBuilder::tcp_v4().build())
    }

    fn udp() -> CapturedPacket {
        CapturedPacket::new(1, FrameBuilder::udp_v4().build())
    }

    fn no_udp() -> impl FilterPredicate {
        predicate_fn("no-udp", |p: &CapturedPacket| {
            !p.protocols().contains(ProtocolTags::UDP)
        })
    }

    #[test]
    fn test_empty_chain_admits() {
        let chain = FilterChain::new();
        assert!(chain.is_empty());
        assert!(chain.admit(&tcp()));
        assert!(chain.admit(&udp()));
    }

    #[test]
    fn test_reject_udp() {
        let mut chain = FilterChain::new();
        chain.add(no_udp());
        assert!(chain.admit(&tcp()));
        assert!(!chain.admit(&udp()));
        assert_eq!(chain.first_rejection(&udp()).map(|(_, n)| n), Some("no-udp"));
        assert!(chain.first_rejection(&tcp()).is_none());
    }

    #[test]
    fn test_short_circuit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = {
            let calls = Arc::clone(&calls);
            predicate_fn("counted", move |_: &CapturedPacket| {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            })
        };

        let mut chain = FilterChain::new();
        chain.add(no_udp());
        chain.add(counted);

        assert!(!chain.admit(&udp()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(chain.admit(&tcp()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut chain = FilterChain::new();
        let id = chain.add(no_udp());
        let keep = chain.add(predicate_fn("all", |_: &CapturedPacket| true));

        assert!(chain.remove(id));
        assert!(!chain.remove(id));
        assert!(!chain.remove(id));
        assert_eq!(chain.names(), vec!["all"]);
        assert!(chain.admit(&udp()));

        // Ids are not reused after removal
        let next = chain.add(no_udp());
        assert_ne!(next, id);
        assert_ne!(next, keep);
    }

    #[test]
    fn test_insertion_order() {
        let mut chain = FilterChain::new();
        chain.add(predicate_fn("a", |_: &CapturedPacket| true));
        chain.add(predicate_fn("b", |_: &CapturedPacket| false));
        chain.add(predicate_fn("c", |_: &CapturedPacket| false));
        assert_eq!(chain.names(), vec!["a", "b", "c"]);
        assert_eq!(chain.first_rejection(&tcp()).map(|(_, n)| n), Some("b"));
        assert_eq!(format!("{:?}", chain), "FilterChain { filters: [\"a\", \"b\", \"c\"] }");
    }
}
