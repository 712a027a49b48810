//! Hand Evaluation Example
//!
//! Deals a few random hands and shows how they rank against each other.

use tri_poker::{
    entities::{Card, Deck, Hand, Suit},
    eval::{Showdown, classify, compare, kicker},
};

fn main() {
    println!("=== Three-Card Hand Evaluation Example ===\n");

    // Example 1: One hand of each category
    println!("Example 1: Categories");
    let samples = [
        Hand::new([Card(4, Suit::Heart), Card(2, Suit::Heart), Card(3, Suit::Heart)]),
        Hand::new([Card(9, Suit::Club), Card(9, Suit::Spade), Card(9, Suit::Heart)]),
        Hand::new([Card(1, Suit::Club), Card(2, Suit::Spade), Card(3, Suit::Heart)]),
        Hand::new([Card(2, Suit::Diamond), Card(9, Suit::Diamond), Card(5, Suit::Diamond)]),
        Hand::new([Card(7, Suit::Club), Card(2, Suit::Spade), Card(7, Suit::Heart)]),
        Hand::new([Card(12, Suit::Club), Card(13, Suit::Spade), Card(1, Suit::Heart)]),
    ];
    for hand in &samples {
        let category = classify(hand);
        println!("{hand}  ->  {category} ({})", category.as_u8());
    }

    // Example 2: Pair kicker
    println!("\nExample 2: Pairs compare by kicker");
    let low = Hand::new([Card(7, Suit::Club), Card(7, Suit::Spade), Card(2, Suit::Heart)]);
    let high = Hand::new([Card(7, Suit::Diamond), Card(7, Suit::Heart), Card(9, Suit::Club)]);
    println!(
        "{low} (kicker {:?}) vs {high} (kicker {:?}): {:?}",
        kicker(&low),
        kicker(&high),
        compare(&low, &high)
    );

    // Example 3: Random heads-up
    println!("\nExample 3: Random heads-up");
    let mut deck = Deck::default();
    deck.shuffle();
    let a = deck.deal_hand();
    let b = deck.deal_hand();
    let verdict = match compare(&a, &b) {
        Showdown::A => "A wins",
        Showdown::B => "B wins",
        Showdown::Tie => "tie",
    };
    println!("A: {a} ({})", classify(&a));
    println!("B: {b} ({})", classify(&b));
    println!("=> {verdict}");
}
