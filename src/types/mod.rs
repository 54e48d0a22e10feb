//! Type definitions for the SendGrid API.

pub mod teammates;
