pub mod push;
pub mod rides;

pub use push::{PushSender, SendError};
pub use rides::RideLookup;
