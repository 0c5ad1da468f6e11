//! Parley: client-side state engine for a chat application.
//!
//! [`directory::ChatDirectory`] holds the chat list, [`log::MessageLog`]
//! holds per-chat messages and drives the optimistic send pipeline, and
//! [`session::Session`] wires both to a [`service::ChatService`].

pub mod command;
pub mod config;
pub mod delay;
pub mod directory;
pub mod log;
pub mod service;
pub mod session;
pub mod view;
