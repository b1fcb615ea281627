//! This is the library of the taskcard notification action.
pub mod config;
pub mod github;
pub mod mergeable;
pub mod notify;
pub mod tracker;
pub mod utils;

#[cfg(test)]
mod tests;
