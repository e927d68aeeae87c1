pub mod handlers;
pub mod protocol;
pub mod session;
pub mod session_state;
pub mod utils;

pub use session::{FtpSession, SharedState};
pub use session_state::*;
