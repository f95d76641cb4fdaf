//! # Game Deals Telegram Bot
//!
//! A Telegram bot for searching a game store, keeping a wishlist and
//! following discounts and item news. The conversation engine talks to the
//! backend API through [`gateway::BackendGateway`] and to users through
//! [`transport::MessagingTransport`].

pub mod bot;
pub mod config;
pub mod context;
pub mod dialogue;
pub mod gateway;
pub mod keyed_lock;
pub mod localization;
pub mod models;
pub mod scheduler;
pub mod settings_cache;
pub mod state_store;
pub mod transport;
