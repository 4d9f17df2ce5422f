//! Storage schema and raw file helpers.
//!
//! The directory tree under the root is the wire format between processes:
//!
//! ```text
//! <root>/server.heartbeat
//! <root>/server.interrupt
//! <root>/requests/<requesterId>/client.heartbeat
//! <root>/requests/<requesterId>/server.reply
//! <root>/sessions/<sessionId>/<participantId>/client.heartbeat
//! <root>/sessions/<sessionId>/<participantId>/move.txt
//! <root>/sessions/<sessionId>/<participantId>/server.reply
//! ```

pub mod io;
pub mod layout;

pub use layout::Layout;
