//! Domain models for the medication reminder session.

mod log;
mod medication;
mod record;
mod risk;
mod user;

pub use log::*;
pub use medication::*;
pub use record::*;
pub use risk::*;
pub use user::*;
