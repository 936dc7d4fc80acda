//! Block-window pairing for sandwich detection.
//!
//! A sandwich around the victim at position `v` is a pair of transactions
//! `(f, b)` with `f < v < b`, both from the same sender, that sender not
//! being the victim's, and both classified as swap candidates. Only the `W`
//! transactions on each side of the victim are searched. Candidate pairs are
//! visited in block order of the frontrun, then of the backrun, and the first
//! qualifying pair wins.

use mev_guard_chain::ChainTransaction;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::error::ScanError;

/// Upper bound on the window width in any mode.
pub const MAX_WINDOW: usize = 100;

/// How swap candidates are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Recipient must be a known router. Never fetches receipts.
    #[default]
    Precise,
    /// Recipient is a known router, or failing that the receipt emits a
    /// known swap event. Receipts are only fetched for same-sender pairs.
    Thorough,
}

impl DetectionMode {
    pub fn default_window(&self) -> usize {
        match self {
            DetectionMode::Precise => 5,
            DetectionMode::Thorough => 20,
        }
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionMode::Precise => f.write_str("precise"),
            DetectionMode::Thorough => f.write_str("thorough"),
        }
    }
}

impl FromStr for DetectionMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "precise" => Ok(DetectionMode::Precise),
            "thorough" => Ok(DetectionMode::Thorough),
            other => Err(ScanError::Validation(format!(
                "unknown detection mode '{}', expected 'precise' or 'thorough'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorConfig {
    pub mode: DetectionMode,
    /// Transactions searched on each side of the victim.
    pub window: usize,
}

impl DetectorConfig {
    /// Config for `mode`, using the mode's default width unless overridden.
    /// The width is clamped to `1..=MAX_WINDOW`.
    pub fn new(mode: DetectionMode, window: Option<usize>) -> Self {
        Self {
            mode,
            window: window
                .unwrap_or_else(|| mode.default_window())
                .clamp(1, MAX_WINDOW),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new(DetectionMode::default(), None)
    }
}

/// The searched neighbourhood of a victim, clipped to the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchWindow {
    pub before_start: usize,
    pub victim_index: usize,
    pub after_end: usize,
}

impl SearchWindow {
    /// `victim_index` must be a valid index into a block of `block_len`.
    pub fn new(block_len: usize, victim_index: usize, width: usize) -> Self {
        debug_assert!(victim_index < block_len);
        Self {
            before_start: victim_index.saturating_sub(width),
            victim_index,
            after_end: victim_index
                .saturating_add(1)
                .saturating_add(width)
                .min(block_len),
        }
    }

    pub fn before(&self) -> Range<usize> {
        self.before_start..self.victim_index
    }

    pub fn after(&self) -> Range<usize> {
        self.victim_index + 1..self.after_end
    }
}

/// Positions of a detected frontrun/backrun pair within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandwichMatch {
    pub frontrun_index: usize,
    pub backrun_index: usize,
}

/// Position of `hash` in the block.
pub fn locate(block: &[ChainTransaction], hash: &alloy::primitives::TxHash) -> Option<usize> {
    block.iter().position(|tx| &tx.hash == hash)
}

/// All same-sender `(frontrun, backrun)` index pairs around the victim, in
/// tie-break order. Pairs from the victim's own sender are excluded.
pub fn sender_pairs(block: &[ChainTransaction], window: SearchWindow) -> Vec<(usize, usize)> {
    let victim_sender = block[window.victim_index].from;
    window
        .before()
        .filter(|&f| block[f].from != victim_sender)
        .flat_map(move |f| {
            window
                .after()
                .filter(move |&b| block[b].from == block[f].from)
                .map(move |b| (f, b))
        })
        .collect()
}

/// First sandwich in the window under a synchronous swap classifier.
pub fn find_sandwich<F>(
    block: &[ChainTransaction],
    window: SearchWindow,
    mut is_swap_candidate: F,
) -> Option<SandwichMatch>
where
    F: FnMut(&ChainTransaction) -> bool,
{
    sender_pairs(block, window)
        .into_iter()
        .find(|&(f, b)| is_swap_candidate(&block[f]) && is_swap_candidate(&block[b]))
        .map(|(frontrun_index, backrun_index)| SandwichMatch {
            frontrun_index,
            backrun_index,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, TxHash};

    fn router() -> Address {
        Address::repeat_byte(0xee)
    }

    fn tx(index: usize, sender: u8, to: Address) -> ChainTransaction {
        ChainTransaction {
            hash: TxHash::with_last_byte(index as u8 + 1),
            from: Address::repeat_byte(sender),
            to: Some(to),
            block_number: Some(100),
            transaction_index: Some(index as u64),
        }
    }

    fn to_router(tx: &ChainTransaction) -> bool {
        tx.to == Some(router())
    }

    /// Deterministic pseudo-random block: senders from a small pool so
    /// repeated senders are common, recipients either the router or not.
    fn generated_block(seed: u64, len: usize) -> Vec<ChainTransaction> {
        let mut state = seed.wrapping_mul(0x9e3779b97f4a7c15).wrapping_add(7);
        (0..len)
            .map(|i| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let sender = (state >> 40) as u8 % 4 + 1;
                let to = if (state >> 20) % 3 == 0 { Address::repeat_byte(0x01) } else { router() };
                tx(i, sender, to)
            })
            .collect()
    }

    #[test]
    fn window_never_exceeds_block_bounds() {
        for len in 1..40 {
            for victim in 0..len {
                for width in 0..45 {
                    let w = SearchWindow::new(len, victim, width);
                    assert!(w.before_start >= victim.saturating_sub(width));
                    assert!(w.before_start <= victim);
                    assert!(w.after_end <= len);
                    assert!(w.after().start > victim);
                    assert!(w.before().len() <= width);
                    assert!(w.after().len() <= width);
                }
            }
        }
    }

    #[test]
    fn window_clips_at_block_edges() {
        let w = SearchWindow::new(10, 1, 5);
        assert_eq!(w.before(), 0..1);
        assert_eq!(w.after(), 2..7);

        let w = SearchWindow::new(10, 9, 5);
        assert_eq!(w.before(), 4..9);
        assert!(w.after().is_empty());
    }

    #[test]
    fn classic_sandwich_is_found() {
        // index 2: B -> router, index 3: victim A -> router, index 5: B -> router
        let block = vec![
            tx(0, 9, Address::repeat_byte(0x01)),
            tx(1, 8, Address::repeat_byte(0x01)),
            tx(2, 0xb, router()),
            tx(3, 0xa, router()),
            tx(4, 7, Address::repeat_byte(0x01)),
            tx(5, 0xb, router()),
        ];
        let window = SearchWindow::new(block.len(), 3, 5);

        let found = find_sandwich(&block, window, to_router).unwrap();
        assert_eq!(found.frontrun_index, 2);
        assert_eq!(found.backrun_index, 5);
    }

    #[test]
    fn non_router_backrun_is_not_a_sandwich() {
        let block = vec![
            tx(0, 9, Address::repeat_byte(0x01)),
            tx(1, 8, Address::repeat_byte(0x01)),
            tx(2, 0xb, router()),
            tx(3, 0xa, router()),
            tx(4, 7, Address::repeat_byte(0x01)),
            tx(5, 0xb, Address::repeat_byte(0x02)),
        ];
        let window = SearchWindow::new(block.len(), 3, 5);

        assert!(find_sandwich(&block, window, to_router).is_none());
    }

    #[test]
    fn earliest_frontrun_wins_over_closer_attacker() {
        let block = vec![
            tx(0, 0xb, router()),
            tx(1, 0xc, router()),
            tx(2, 0xa, router()),
            tx(3, 0xc, router()),
            tx(4, 0xb, router()),
        ];
        let window = SearchWindow::new(block.len(), 2, 5);

        let found = find_sandwich(&block, window, to_router).unwrap();
        assert_eq!((found.frontrun_index, found.backrun_index), (0, 4));
    }

    #[test]
    fn victim_sender_is_never_the_attacker() {
        let block = vec![
            tx(0, 0xa, router()),
            tx(1, 0xa, router()),
            tx(2, 0xa, router()),
        ];
        let window = SearchWindow::new(block.len(), 1, 5);
        assert!(sender_pairs(&block, window).is_empty());
        assert!(find_sandwich(&block, window, to_router).is_none());
    }

    #[test]
    fn generated_blocks_uphold_match_invariants() {
        for seed in 0..300u64 {
            let block = generated_block(seed, 3 + (seed as usize % 30));
            for victim in 0..block.len() {
                let window = SearchWindow::new(block.len(), victim, 5);
                let Some(found) = find_sandwich(&block, window, to_router) else {
                    continue;
                };
                let front = &block[found.frontrun_index];
                let back = &block[found.backrun_index];
                assert!(found.frontrun_index < victim && victim < found.backrun_index);
                assert!(window.before().contains(&found.frontrun_index));
                assert!(window.after().contains(&found.backrun_index));
                assert_eq!(front.from, back.from);
                assert_ne!(front.from, block[victim].from);
                assert!(to_router(front) && to_router(back));
            }
        }
    }

    #[test]
    fn detection_is_deterministic() {
        for seed in 0..50u64 {
            let block = generated_block(seed, 25);
            for victim in 0..block.len() {
                let window = SearchWindow::new(block.len(), victim, 5);
                assert_eq!(
                    find_sandwich(&block, window, to_router),
                    find_sandwich(&block, window, to_router)
                );
            }
        }
    }

    #[test]
    fn config_clamps_window() {
        assert_eq!(DetectorConfig::new(DetectionMode::Precise, None).window, 5);
        assert_eq!(DetectorConfig::new(DetectionMode::Thorough, None).window, 20);
        assert_eq!(DetectorConfig::new(DetectionMode::Thorough, Some(500)).window, MAX_WINDOW);
        assert_eq!(DetectorConfig::new(DetectionMode::Precise, Some(0)).window, 1);
    }

    #[test]
    fn parses_detection_modes() {
        assert_eq!("THOROUGH".parse::<DetectionMode>().unwrap(), DetectionMode::Thorough);
        assert!("fuzzy".parse::<DetectionMode>().is_err());
    }
}
