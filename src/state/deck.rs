//! Board dealing: symbol pool, pairs and the shuffled deck of a level.

use rand::{Rng, seq::SliceRandom};
use serde::Serialize;

/// Symbols a board can be dealt from. Every entry is distinct.
pub const SYMBOL_POOL: [&str; 50] = [
    "🐶", "🐱", "🐭", "🐹", "🐰", "🦊", "🐻", "🐼", "🐨", "🐯", //
    "🦁", "🦓", "🐮", "🐷", "🐸", "🐵", "🐔", "🐧", "🐦", "🦆", //
    "🦅", "🦉", "🦇", "🐺", "🐗", "🐴", "🦄", "🐝", "🐛", "🦋", //
    "🐌", "🐞", "🐜", "🦟", "🦗", "🕷", "🦔", "🦂", "🐢", "🐍", //
    "🦎", "🦖", "🦕", "🐙", "🦑", "🦐", "🦞", "🦀", "🐡", "🐠", //
];

/// Largest pair count a single deck can hold.
pub const MAX_PAIRS: usize = SYMBOL_POOL.len();

/// A single card on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    /// Identifier unique within the board it was dealt on.
    pub id: String,
    /// Face value shared with exactly one other card on the board.
    pub symbol: &'static str,
    /// Card is currently face up.
    pub is_flipped: bool,
    /// Card belongs to a confirmed pair.
    pub is_matched: bool,
}

impl Card {
    fn face_down(id: String, symbol: &'static str) -> Self {
        Self {
            id,
            symbol,
            is_flipped: false,
            is_matched: false,
        }
    }
}

/// Deal `pair_count` pairs of distinct symbols in uniformly random order.
///
/// Pair counts above [`MAX_PAIRS`] are capped at the pool size.
pub fn generate_deck<R>(pair_count: usize, rng: &mut R) -> Vec<Card>
where
    R: Rng + ?Sized,
{
    let pair_count = pair_count.min(MAX_PAIRS);

    let mut symbols = SYMBOL_POOL.to_vec();
    symbols.shuffle(rng);
    symbols.truncate(pair_count);

    let mut deck: Vec<Card> = symbols
        .into_iter()
        .enumerate()
        .flat_map(|(pair, symbol)| {
            [
                Card::face_down(format!("card-{pair}-a"), symbol),
                Card::face_down(format!("card-{pair}-b"), symbol),
            ]
        })
        .collect();

    deck.shuffle(rng);
    deck
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn symbol_pool_has_no_duplicates() {
        let unique: HashSet<_> = SYMBOL_POOL.iter().collect();
        assert_eq!(unique.len(), SYMBOL_POOL.len());
    }

    #[test]
    fn every_pair_count_yields_two_cards_per_symbol() {
        let mut rng = StdRng::seed_from_u64(7);
        for pairs in 1..=MAX_PAIRS {
            let deck = generate_deck(pairs, &mut rng);
            assert_eq!(deck.len(), pairs * 2);

            let mut counts: HashMap<&str, usize> = HashMap::new();
            for card in &deck {
                *counts.entry(card.symbol).or_default() += 1;
            }
            assert_eq!(counts.len(), pairs);
            assert!(counts.values().all(|&count| count == 2));

            let ids: HashSet<&str> = deck.iter().map(|card| card.id.as_str()).collect();
            assert_eq!(ids.len(), deck.len());
        }
    }

    #[test]
    fn cards_start_face_down() {
        let mut rng = StdRng::seed_from_u64(1);
        let deck = generate_deck(6, &mut rng);
        assert!(deck.iter().all(|card| !card.is_flipped && !card.is_matched));
    }

    #[test]
    fn oversized_request_is_capped() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(generate_deck(MAX_PAIRS + 10, &mut rng).len(), MAX_PAIRS * 2);
    }

    #[test]
    fn same_seed_deals_same_board() {
        let first = generate_deck(12, &mut StdRng::seed_from_u64(42));
        let second = generate_deck(12, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn shuffle_does_not_keep_pairs_adjacent() {
        // A fair shuffle of 24 pairs essentially never leaves every pair side by side.
        let deck = generate_deck(24, &mut StdRng::seed_from_u64(11));
        let all_adjacent = deck
            .chunks(2)
            .all(|chunk| chunk[0].symbol == chunk[1].symbol);
        assert!(!all_adjacent);
    }
}
