pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use config::AppConfig;
pub use core::notify::{ModeratorNotifier, SubscriberNotice, SubscriberNotifier};
pub use core::overdue::find_overdue;
pub use core::query::ClosureQuery;
pub use utils::error::{ClosureError, Result};
