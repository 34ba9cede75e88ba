//! Auth-domain identifiers, bearer secrets, and the session credential pair.

pub mod credentials;
pub mod id;
pub mod secret;

pub use credentials::*;
pub use id::*;
pub use secret::*;
