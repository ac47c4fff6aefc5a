//! Gameplay core for a vertical-scrolling key rhythm game: note scheduling,
//! timing judgment, health and the play session state machine.

pub mod config;
pub mod gameplay;
pub mod input;
pub mod time;

pub use config::{SessionSettings, SettingsError};
pub use gameplay::session::{
    EndReason, SessionConfig, SessionController, SessionEvent, SessionObserver, SessionState,
};
