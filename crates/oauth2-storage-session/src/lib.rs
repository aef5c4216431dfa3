//! Transaction stores bundled with the OAuth2 toolkit.
//!
//! - [`SessionStore`] keeps pending transactions inside the host session
//!   (legacy shape, serializes the client).
//! - [`MemoryStore`] keeps them in process memory, keyed by a random id
//!   (modern shape).

mod memory;
mod session;

pub use memory::MemoryStore;
pub use session::SessionStore;
