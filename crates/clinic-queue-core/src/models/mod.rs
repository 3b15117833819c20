//! Domain models for the clinic call queue.

mod announcement;
mod patient;
mod room;

pub use announcement::*;
pub use patient::*;
pub use room::*;
