//! End-to-end scenarios: a coordinator and several peers sharing one
//! temporary storage root inside a single test process.

pub mod abandonment;
pub mod helpers;
pub mod lifecycle;
pub mod pairing;
pub mod turns;

pub use helpers::*;
