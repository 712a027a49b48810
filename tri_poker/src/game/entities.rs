use rand::{Rng, seq::SliceRandom};
use std::{
    fmt,
    ops::{Add, AddAssign},
};

use super::constants::{DECK_SIZE, HAND_SIZE, MAX_USERNAME_LENGTH};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values.
pub type Value = u8;

/// Value of the ace. Aces are always low when ranking hands.
pub const ACE: Value = 1;

/// A card is a tuple of a uInt8 value (ace=1u8 ... king=13u8)
/// and a suit.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Card(pub Value, pub Suit);

impl Card {
    /// Value the card contributes to a hand's sum tie-break. Aces count
    /// as 14 there even though they rank low everywhere else.
    #[must_use]
    pub const fn sum_value(&self) -> u32 {
        if self.0 == ACE { 14 } else { self.0 as u32 }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            1 => "A",
            11 => "J",
            12 => "Q",
            13 => "K",
            v => &v.to_string(),
        };
        let repr = format!("{value}/{}", self.1);
        write!(f, "{repr:>4}")
    }
}

/// Three cards dealt to a participant, kept in dealing order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Hand(pub [Card; HAND_SIZE]);

impl Hand {
    #[must_use]
    pub const fn new(cards: [Card; HAND_SIZE]) -> Self {
        Self(cards)
    }

    #[must_use]
    pub fn cards(&self) -> &[Card; HAND_SIZE] {
        &self.0
    }

    /// Sum of the card values with aces counting as 14.
    #[must_use]
    pub fn sum(&self) -> u32 {
        self.0.iter().map(Card::sum_value).sum()
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = &self.0;
        write!(f, "[{a}] [{b}] [{c}]")
    }
}

#[derive(Debug)]
pub struct Deck {
    cards: Vec<Card>,
    pub deck_idx: usize,
}

impl Deck {
    /// # Panics
    ///
    /// Panics when every card was already dealt. Dealing is bounded by the
    /// maximum participant count, so this only happens on a logic error.
    pub fn deal_card(&mut self) -> Card {
        let card = *self
            .cards
            .get(self.deck_idx)
            .expect("Deck exhausted - this indicates a critical bug!");
        self.deck_idx += 1;
        card
    }

    pub fn deal_hand(&mut self) -> Hand {
        Hand([self.deal_card(), self.deal_card(), self.deal_card()])
    }

    pub fn remaining(&self) -> usize {
        self.cards.len() - self.deck_idx
    }

    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::rng());
    }

    /// Shuffle with a caller-provided generator; seeded generators make
    /// deals reproducible in tests.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
        self.deck_idx = 0;
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for value in 1u8..14u8 {
                cards.push(Card(value, suit));
            }
        }
        Self { cards, deck_idx: 0 }
    }
}

/// Money in whole cents. Balances and the pot can never go negative since
/// the type can't represent it; debits go through [`Money::checked_sub`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    #[must_use]
    pub const fn from_units(units: u64) -> Self {
        Self(units * 100)
    }

    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Split into two shares that add back up to `self`. The first share
    /// takes the odd cent.
    #[must_use]
    pub const fn halves(self) -> (Money, Money) {
        let low = self.0 / 2;
        (Money(self.0 - low), Money(low))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Username(String);

impl Username {
    pub fn new(s: &str) -> Self {
        let mut username: String = s
            .trim()
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .collect();
        if let Some((idx, _)) = username.char_indices().nth(MAX_USERNAME_LENGTH) {
            username.truncate(idx);
        }
        Self(username)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&str> for Username {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashSet;

    // === Card Tests ===

    #[test]
    fn test_card_display() {
        assert_eq!(Card(1, Suit::Club).to_string(), " A/♣");
        assert_eq!(Card(10, Suit::Heart).to_string(), "10/♥");
        assert_eq!(Card(13, Suit::Spade).to_string(), " K/♠");
    }

    #[test]
    fn test_ace_sums_as_fourteen() {
        assert_eq!(Card(ACE, Suit::Diamond).sum_value(), 14);
        assert_eq!(Card(13, Suit::Diamond).sum_value(), 13);
        let hand = Hand([Card(1, Suit::Club), Card(5, Suit::Heart), Card(9, Suit::Spade)]);
        assert_eq!(hand.sum(), 28);
    }

    // === Deck Tests ===

    #[test]
    fn test_deck_initialization() {
        let deck = Deck::default();
        assert_eq!(deck.cards.len(), DECK_SIZE);
        let unique: HashSet<_> = deck.cards.iter().collect();
        assert_eq!(unique.len(), DECK_SIZE);
        assert!(deck.cards.iter().all(|c| (1..=13).contains(&c.0)));
    }

    #[test]
    fn test_deck_shuffle_resets_index() {
        let mut deck = Deck::default();
        deck.deal_hand();
        deck.shuffle();
        assert_eq!(deck.deck_idx, 0);
        assert_eq!(deck.remaining(), DECK_SIZE);
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let mut a = Deck::default();
        let mut b = Deck::default();
        a.shuffle_with(&mut StdRng::seed_from_u64(7));
        b.shuffle_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a.cards, b.cards);
    }

    #[test]
    fn test_deal_hand_advances_three() {
        let mut deck = Deck::default();
        deck.deal_hand();
        assert_eq!(deck.deck_idx, 3);
        assert_eq!(deck.remaining(), 49);
    }

    #[test]
    #[should_panic(expected = "Deck exhausted")]
    fn test_deck_exhaustion_panics() {
        let mut deck = Deck::default();
        for _ in 0..=DECK_SIZE {
            deck.deal_card();
        }
    }

    // === Money Tests ===

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_units(12).to_string(), "12.00");
        assert_eq!(Money::from_cents(305).to_string(), "3.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_money_checked_sub() {
        let balance = Money::from_units(2);
        assert_eq!(balance.checked_sub(Money::from_units(2)), Some(Money::ZERO));
        assert_eq!(balance.checked_sub(Money::from_cents(201)), None);
    }

    #[test]
    fn test_money_halves_conserve_total() {
        assert_eq!(
            Money::from_units(10).halves(),
            (Money::from_units(5), Money::from_units(5))
        );
        let (a, b) = Money::from_cents(1001).halves();
        assert_eq!(a, Money::from_cents(501));
        assert_eq!(b, Money::from_cents(500));
        assert_eq!(a + b, Money::from_cents(1001));
    }

    // === Username Tests ===

    #[test]
    fn test_username_sanitizes_whitespace() {
        assert_eq!(Username::new("  big  al ").as_str(), "big__al");
    }

    #[test]
    fn test_username_truncates() {
        let long = "x".repeat(MAX_USERNAME_LENGTH * 2);
        assert_eq!(Username::new(&long).as_str().len(), MAX_USERNAME_LENGTH);
    }
}
