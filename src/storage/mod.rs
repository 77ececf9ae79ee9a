//! Account persistence

pub mod memory;
pub mod traits;

pub use memory::MemoryAccountStore;
pub use traits::{AccountStore, LockoutPolicy, PreferencesUpdate, ProfileUpdate};
