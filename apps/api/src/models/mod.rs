//! Typed views over normalized model replies.

pub mod analysis;
pub mod practice;
pub mod questions;
