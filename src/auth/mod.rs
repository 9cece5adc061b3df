pub mod password;
pub mod session;

pub use session::{FileSessionSlot, MemorySessionSlot, SessionSlot, SessionUser, SESSION_SLOT};
