//! graphpost library
//!
//! Publishes images, reels and stories through the Graph API's two-phase
//! container workflow: create a media container, wait for the platform to
//! process it, then publish it.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod graph;
pub mod logging;
pub mod publish;
