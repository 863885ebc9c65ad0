//! Adapters for the session store and external collaborators.

pub mod judges;
pub mod memory;
pub mod mock;
pub mod scorers;
pub mod search;
