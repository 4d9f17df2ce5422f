//! Turn-based sessions between processes that share nothing but a
//! directory tree.
//!
//! A coordinator ([`coordinator::Matchmaker`]) pairs join requests into
//! sessions; each [`peer::Peer`] heartbeats, waits for a pairing notice and
//! then exchanges turn signals and moves with its
//! [`coordinator::SessionCoordinator`] through plain files. Failure is
//! detected from heartbeats that stop changing.

pub mod commands;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fs;
pub mod game;
pub mod heartbeat;
pub mod models;
pub mod monitor;
pub mod peer;
pub mod services;
pub mod validation;
