// ABOUTME: Cyclic arrangement of resource tokens shared by neighboring agents.
// ABOUTME: Agent i is assigned token i on its left and token (i+1) mod n on its right.

use std::sync::Arc;

use super::token::ResourceToken;
use crate::error::ConfigError;

/// N tokens arranged in a cycle.
///
/// Adjacency is fixed for the lifetime of the ring. Each token is shared by
/// exactly two agents: the one on its right and the one on its left.
#[derive(Debug)]
pub struct ResourceRing {
    tokens: Vec<Arc<ResourceToken>>,
}

impl ResourceRing {
    /// Build a ring of `n` free tokens.
    ///
    /// Returns `Err(ConfigError::TooFewAgents)` for `n < 2`, since a single
    /// agent would be its own neighbor.
    pub fn build(n: usize) -> Result<Self, ConfigError> {
        if n < 2 {
            return Err(ConfigError::TooFewAgents(n));
        }

        let tokens = (0..n).map(|i| Arc::new(ResourceToken::new(i))).collect();
        Ok(Self { tokens })
    }

    /// Number of tokens (and agents) in the ring.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always false for a built ring; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Left and right token indices for agent `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is not a valid agent index.
    pub fn neighbors_of(&self, i: usize) -> (usize, usize) {
        let n = self.tokens.len();
        assert!(i < n, "agent index {} out of range for ring of {}", i, n);
        (i, (i + 1) % n)
    }

    /// Shared handles to the left and right tokens of agent `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is not a valid agent index. See [`get_pair`](Self::get_pair).
    pub fn pair(&self, i: usize) -> (Arc<ResourceToken>, Arc<ResourceToken>) {
        let (left, right) = self.neighbors_of(i);
        (self.tokens[left].clone(), self.tokens[right].clone())
    }

    /// Like [`pair`](Self::pair), but `None` for an out-of-range index.
    pub fn get_pair(&self, i: usize) -> Option<(Arc<ResourceToken>, Arc<ResourceToken>)> {
        (i < self.tokens.len()).then(|| self.pair(i))
    }

    /// The token at ring index `i`, if it exists.
    pub fn token(&self, i: usize) -> Option<&Arc<ResourceToken>> {
        self.tokens.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceToken>> {
        self.tokens.iter()
    }

    /// Number of tokens currently held by some agent.
    pub fn held_count(&self) -> usize {
        self.tokens.iter().filter(|t| t.is_held()).count()
    }
}
