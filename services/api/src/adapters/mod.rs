pub mod conversation;
pub mod credentials;
pub mod db;
pub mod memory;

pub use conversation::OpenAiConversationAdapter;
pub use credentials::Argon2Credentials;
pub use db::DbAdapter;
pub use memory::InMemoryDb;
