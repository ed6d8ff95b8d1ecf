pub mod balance;
pub mod builder;
pub mod config;
pub mod editor;
pub mod error;
pub mod events;
pub mod extract;
pub mod ical;
pub mod layout;
pub mod llm;
pub mod logging;
pub mod model;
pub mod repair;
pub mod session;
pub mod stats;
pub mod suggest;
pub mod time;
pub mod trace;
