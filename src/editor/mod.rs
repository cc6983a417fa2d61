mod core;
mod keys;
mod raw_mode;

pub use self::core::{Edit, LineEditor};
pub use keys::{Key, KeyDecoder};
pub use raw_mode::RawModeGuard;
