pub mod chat;
pub mod health;
pub mod inventory;
pub mod reset;
pub mod stop;
pub mod stream;
pub mod transcript;
