//! Outbound notification collaborators

pub mod telegram;

pub use telegram::TelegramNotifier;
