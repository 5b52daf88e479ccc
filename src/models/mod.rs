mod challenge;
mod chat;
mod coach;
mod habit;
pub mod input;
mod message;
mod partner;
mod user;

pub use challenge::Challenge;
pub use chat::Chat;
pub use coach::CoachNote;
pub use habit::Habit;
pub use message::Message;
pub use partner::Partnership;
pub use user::User;
