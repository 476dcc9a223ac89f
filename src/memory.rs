//! Bounded per-session conversation memory.

use serde::{Deserialize, Serialize};

/// One completed exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub input: String,
    pub answer: String,
}

/// Sliding window over the most recent exchanges.
///
/// Only the answering path appends and only `clear` resets; a failed query
/// must leave the window untouched, which callers get by saving after the
/// answer succeeds.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    window: usize,
    turns: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            turns: Vec::new(),
        }
    }

    /// The retained exchanges, oldest first.
    pub fn load(&self) -> &[Turn] {
        &self.turns
    }

    pub fn save(&mut self, input: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn {
            input: input.into(),
            answer: answer.into(),
        });
        if self.turns.len() > self.window {
            let excess = self.turns.len() - self.window;
            self.turns.drain(..excess);
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_only_the_most_recent_exchanges() {
        let mut memory = ConversationMemory::new(5);
        for i in 1..=6 {
            memory.save(format!("Q{i}"), format!("A{i}"));
        }

        let turns = memory.load();
        assert_eq!(turns.len(), 5);
        assert_eq!(turns.first().unwrap().input, "Q2");
        assert_eq!(turns.last().unwrap().input, "Q6");
    }

    #[test]
    fn clear_resets_the_window() {
        let mut memory = ConversationMemory::new(5);
        memory.save("Q1", "A1");
        memory.clear();
        assert!(memory.is_empty());
        assert!(memory.load().is_empty());
    }
}
