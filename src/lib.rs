// ABOUTME: Root module for forkring - agents sharing a ring of exclusive resources.
// ABOUTME: Re-exports all public types from submodules.

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod delay;
pub mod error;
pub mod hook;
pub mod prelude;
pub mod resource;

pub use error::TableError;
