pub mod domain;
pub mod ports;

pub use domain::{default_title, Chat, ChatMessage, Role, User, UserCredentials};
pub use ports::{
    ConversationService, CredentialService, DatabaseService, PortError, PortResult,
};
