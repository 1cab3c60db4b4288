//! Domain entities - Core business objects with no external dependencies

pub mod user;
pub mod message;
pub mod keyword;

pub use user::User;
pub use message::{MessageEvent, MessageKind, OutgoingMessage, Delivery};
pub use keyword::{KeywordRule, KeywordReply, KeywordSettings, KeywordsState, SettingKey};
