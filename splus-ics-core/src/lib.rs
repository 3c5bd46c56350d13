//! Splus ICS Core Library
//!
//! This library turns the public timetable pages of a Splus installation into
//! a list of timetabled events and serializes them as an ICS calendar.

pub mod calendar;
pub mod catalog;
pub mod config;
pub mod error;
pub mod grid;
pub mod ics;
pub mod resolver;
pub mod source;
pub mod types;

// Re-export core types and error handling
pub use error::{Error, Result};
pub use types::*;

/// Commonly used items
pub mod prelude {
    pub use crate::{
        calendar::*, catalog::*, config::*, grid::*, ics::*, resolver::*, source::*, types::*,
    };
}
