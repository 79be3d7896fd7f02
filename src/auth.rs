//! Consumer and token credentials plus the redacting secret wrapper.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
