use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::input::Button;

/// Symbols the unlock gesture is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    Up,
    Down,
}

impl Symbol {
    pub fn from_button(button: Button) -> Option<Self> {
        match button {
            Button::Up => Some(Self::Up),
            Button::Down => Some(Self::Down),
            _ => None,
        }
    }
}

pub const DEFAULT_SECRET: [Symbol; 3] = [Symbol::Up, Symbol::Down, Symbol::Up];

/// Sliding window over the most recent inputs, compared against a fixed secret
/// after every append. The window is as long as the secret.
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    secret: Vec<Symbol>,
    window: VecDeque<Symbol>,
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET.to_vec())
    }
}

impl GestureRecognizer {
    /// An empty secret falls back to the default one; an empty gesture would
    /// never be checked and the prompt could not be left.
    pub fn new(secret: Vec<Symbol>) -> Self {
        let secret = if secret.is_empty() {
            DEFAULT_SECRET.to_vec()
        } else {
            secret
        };
        let window = VecDeque::with_capacity(secret.len());
        Self { secret, window }
    }

    pub fn append(&mut self, symbol: Symbol) -> bool {
        self.window.push_back(symbol);
        while self.window.len() > self.secret.len() {
            self.window.pop_front();
        }
        self.window.len() == self.secret.len() && self.window.iter().eq(self.secret.iter())
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.secret.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Symbol::{Down, Up};
    use super::*;

    fn feed(seq: &[Symbol]) -> Vec<bool> {
        let mut rec = GestureRecognizer::default();
        seq.iter().map(|s| rec.append(*s)).collect()
    }

    #[test]
    fn exact_secret_matches_on_last_symbol() {
        assert_eq!(feed(&[Up, Down, Up]), vec![false, false, true]);
    }

    #[test]
    fn trailing_three_are_what_counts() {
        assert_eq!(feed(&[Down, Up, Down, Up]).last(), Some(&true));
        assert_eq!(feed(&[Up, Up, Down, Up]).last(), Some(&true));
    }

    #[test]
    fn wrong_sequence_never_matches() {
        assert!(feed(&[Up, Down, Down]).iter().all(|m| !m));
        assert!(feed(&[Down, Down, Down, Up, Up]).iter().all(|m| !m));
    }

    #[test]
    fn window_never_exceeds_secret_length() {
        let mut rec = GestureRecognizer::default();
        for _ in 0..10 {
            rec.append(Down);
            assert!(rec.len() <= 3);
        }
        assert_eq!(rec.len(), 3);
    }

    #[test]
    fn reset_clears_progress() {
        let mut rec = GestureRecognizer::default();
        rec.append(Up);
        rec.append(Down);
        rec.reset();
        assert!(rec.is_empty());
        assert!(!rec.append(Up));
    }

    #[test]
    fn custom_secret_sets_window_size() {
        let mut rec = GestureRecognizer::new(vec![Down, Down, Up, Up]);
        assert_eq!(rec.capacity(), 4);
        assert!(!rec.append(Down));
        assert!(!rec.append(Down));
        assert!(!rec.append(Up));
        assert!(rec.append(Up));
    }

    #[test]
    fn empty_secret_uses_default() {
        let rec = GestureRecognizer::new(Vec::new());
        assert_eq!(rec.capacity(), 3);
    }

    #[test]
    fn only_up_and_down_are_symbols() {
        assert_eq!(Symbol::from_button(Button::Up), Some(Up));
        assert_eq!(Symbol::from_button(Button::Down), Some(Down));
        assert_eq!(Symbol::from_button(Button::Ok), None);
    }
}
