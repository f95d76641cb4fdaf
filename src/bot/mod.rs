//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Routes incoming text to the state machine or the command router
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `state_machine`: Advances pending conversations
//! - `command_router`: Commands of idle users
//! - `callback_router`: Decodes and applies callback tokens
//! - `ui_builder`: Creates keyboards and formats messages

pub mod callback_handler;
pub mod callback_router;
pub mod command_router;
pub mod message_handler;
pub mod state_machine;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use callback_handler::{callback_handler, handle_callback};
pub use message_handler::{handle_text, message_handler};

pub use callback_router::{dispatch_callback, CallbackAction, CallbackReply};
pub use command_router::{collect_successes, dispatch, Command};
pub use state_machine::{advance, Transition};
