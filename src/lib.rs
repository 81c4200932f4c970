pub mod config;
pub mod error;
pub mod feed;
pub mod layout;
pub mod readiness;
pub mod session;
pub mod social;
pub mod source;
