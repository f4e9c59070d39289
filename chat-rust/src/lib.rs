mod ask;
mod conversation;
mod errors;
mod types;

pub use ask::Ask;
pub use conversation::{Conversation, RETRY_INSTRUCTION};
pub use errors::{ChatError, ChatResult};
pub use types::*;
