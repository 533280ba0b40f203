// ABOUTME: Shared resource primitives for the ring.
// ABOUTME: Contains the exclusive token and the cyclic ring that assigns token pairs.

mod ring;
mod token;

pub use ring::ResourceRing;
pub use token::ResourceToken;

#[cfg(test)]
mod token_test;
