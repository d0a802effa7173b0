pub mod auth;
pub mod console;
pub mod inbox;
pub mod poller;
pub mod transcript;

pub use auth::AuthService;
pub use console::AssistantConsole;
pub use inbox::{Inbox, MergeOutcome};
pub use transcript::TranscriptStore;
