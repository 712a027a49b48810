//! Three-card hand classification and head-to-head comparison.
//!
//! The category order is fixed by the house rules, not by standard poker
//! odds: three of a kind is checked before straights and flushes, and the
//! ace only ever ranks low.

use std::{cmp::Ordering, fmt};

use super::entities::{Card, Hand, Value};

/// Hand categories, strongest first. The discriminant is the category
/// number, so a lower number is a stronger hand.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum Category {
    StraightFlush = 0,
    ThreeOfAKind = 1,
    Straight = 2,
    Flush = 3,
    Pair = 4,
    HighCard = 5,
}

impl Category {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::StraightFlush => "straight flush",
            Self::ThreeOfAKind => "three of a kind",
            Self::Straight => "straight",
            Self::Flush => "flush",
            Self::Pair => "pair",
            Self::HighCard => "high card",
        };
        write!(f, "{repr}")
    }
}

/// Result of comparing two hands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Showdown {
    A,
    B,
    Tie,
}

impl From<Ordering> for Showdown {
    fn from(value: Ordering) -> Self {
        match value {
            Ordering::Greater => Self::A,
            Ordering::Less => Self::B,
            Ordering::Equal => Self::Tie,
        }
    }
}

/// Cards sorted by value. The sort is stable so equal values keep their
/// dealing order.
#[must_use]
pub fn sorted(hand: &Hand) -> [Card; 3] {
    let mut cards = *hand.cards();
    cards.sort_by_key(|card| card.0);
    cards
}

#[must_use]
pub fn classify(hand: &Hand) -> Category {
    let cards = sorted(hand);
    let [a, b, c] = cards;

    if a.0 == b.0 && b.0 == c.0 {
        return Category::ThreeOfAKind;
    }

    let straight = a.0 + 1 == b.0 && b.0 + 1 == c.0;
    let flush = a.1 == b.1 && b.1 == c.1;
    match (straight, flush) {
        (true, true) => return Category::StraightFlush,
        (true, false) => return Category::Straight,
        (false, true) => return Category::Flush,
        (false, false) => {}
    }

    if pair_positions(&cards).is_some() {
        Category::Pair
    } else {
        Category::HighCard
    }
}

/// Index pair of the first two equal values, checked (0,1), (0,2), (1,2).
fn pair_positions(cards: &[Card; 3]) -> Option<(usize, usize)> {
    [(0, 1), (0, 2), (1, 2)]
        .into_iter()
        .find(|&(i, j)| cards[i].0 == cards[j].0)
}

/// Value of the card that isn't part of the pair. Only meaningful for
/// hands classified as [`Category::Pair`].
#[must_use]
pub fn kicker(hand: &Hand) -> Option<Value> {
    let cards = sorted(hand);
    let (i, j) = pair_positions(&cards)?;
    let k = 3 - i - j;
    Some(cards[k].0)
}

/// Compare two hands. `Showdown::A` means `a` wins.
#[must_use]
pub fn compare(a: &Hand, b: &Hand) -> Showdown {
    let (cat_a, cat_b) = (classify(a), classify(b));
    if cat_a != cat_b {
        // Lower category number is stronger.
        return cat_b.cmp(&cat_a).into();
    }

    if cat_a == Category::Pair {
        let by_kicker = kicker(a).cmp(&kicker(b));
        if by_kicker != Ordering::Equal {
            return by_kicker.into();
        }
    }

    a.sum().cmp(&b.sum()).into()
}
