//! Frontier traversal strategies
//!
//! The strategy only decides which end of the frontier the dispatcher pops
//! from; worker completion order is not affected.

use crate::frontier::Frontier;
use rand::Rng;
use std::fmt;

/// Which end of the frontier a pop takes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopSide {
    /// Oldest URL: breadth-first
    Front,
    /// Newest URL: depth-first
    Back,
}

/// How the dispatcher drains the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalStrategy {
    /// Always pop the oldest URL
    #[default]
    BreadthFirst,
    /// Always pop the newest URL
    DepthFirst,
    /// Pop the newest URL with the given probability (percent, 1-99)
    Mixed(u8),
}

impl TraversalStrategy {
    /// Builds a strategy from a depth-first mix percentage, clamped to 0-100
    ///
    /// 0 is pure breadth-first and 100 is pure depth-first.
    pub fn from_mix_percentage(percent: i64) -> Self {
        match percent.clamp(0, 100) {
            0 => Self::BreadthFirst,
            100 => Self::DepthFirst,
            p => Self::Mixed(p as u8),
        }
    }

    /// Parses a configured strategy name
    ///
    /// Accepts `bfs`, `dfs` and `mixedN` case-insensitively, where `N` is the
    /// depth-first percentage. Anything else falls back to breadth-first with
    /// a warning.
    ///
    /// # Examples
    ///
    /// ```
    /// use polite_crawler::TraversalStrategy;
    ///
    /// assert_eq!(TraversalStrategy::parse("dfs"), TraversalStrategy::DepthFirst);
    /// assert_eq!(TraversalStrategy::parse("mixed40"), TraversalStrategy::Mixed(40));
    /// assert_eq!(TraversalStrategy::parse("mixed250"), TraversalStrategy::DepthFirst);
    /// assert_eq!(TraversalStrategy::parse("zigzag"), TraversalStrategy::BreadthFirst);
    /// ```
    pub fn parse(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "bfs" => Self::BreadthFirst,
            "dfs" => Self::DepthFirst,
            other => match other.strip_prefix("mixed").map(str::parse::<i64>) {
                Some(Ok(percent)) => Self::from_mix_percentage(percent),
                _ => {
                    tracing::warn!("Unknown strategy {:?}, defaulting to bfs", name);
                    Self::BreadthFirst
                }
            },
        }
    }

    /// Decides which end the next pop takes from
    pub fn pop_side<R: Rng + ?Sized>(&self, rng: &mut R) -> PopSide {
        match self {
            Self::BreadthFirst => PopSide::Front,
            Self::DepthFirst => PopSide::Back,
            Self::Mixed(p) => {
                if rng.gen_range(0..100u8) < *p {
                    PopSide::Back
                } else {
                    PopSide::Front
                }
            }
        }
    }

    /// Pops the next candidate from `frontier` according to the strategy
    pub fn next_candidate<R: Rng + ?Sized>(
        &self,
        frontier: &Frontier,
        rng: &mut R,
    ) -> Option<String> {
        match self.pop_side(rng) {
            PopSide::Front => frontier.pop_front(),
            PopSide::Back => frontier.pop_back(),
        }
    }
}

impl fmt::Display for TraversalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BreadthFirst => write!(f, "bfs"),
            Self::DepthFirst => write!(f, "dfs"),
            Self::Mixed(p) => write!(f, "mixed{}", p),
        }
    }
}
