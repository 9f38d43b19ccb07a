//! Terminal helpers for xcode-png-optim
//!
//! Provides shared CLI functionality:
//! - Status messages and error reports
//! - Size and duration formatting
//! - Progress indicators

#![warn(missing_docs)]

pub mod output;
pub mod progress;
