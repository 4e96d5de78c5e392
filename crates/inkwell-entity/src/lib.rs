//! # inkwell-entity
//!
//! Domain entity models for Inkwell. Structs here represent table rows
//! or domain value objects. Rows that embed a related user are read
//! through a flat `*Row` struct and converted, so the serialized form
//! keeps the nested shape ownership conditions walk (`author.id`,
//! `sender.id`, `receivers.receiver.id`).

pub mod content;
pub mod message;
pub mod rbac;
pub mod user;
