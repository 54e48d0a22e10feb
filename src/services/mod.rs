//! Service implementations for the SendGrid API.

mod teammates;

pub use teammates::TeammatesService;
