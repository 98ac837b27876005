//! Data shapes exchanged with Google and with the browser.
//!
//! Drive descriptors are passed through verbatim; the user types are what
//! this service derives from a verified ID token.

pub mod drive_file;
pub mod user;
