//! Private messages between users.

pub mod model;

pub use model::{CreateMessage, Message, MessageReceipt, MessageRow, ReceiptRow};
