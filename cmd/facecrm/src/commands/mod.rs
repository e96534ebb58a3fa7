//! CLI commands module.

mod config;
mod contacts;
mod enroll;
mod matching;
mod scan;
mod util;

pub use config::ConfigCommand;
pub use contacts::ContactsCommand;
pub use enroll::EnrollCommand;
pub use matching::MatchCommand;
pub use scan::ScanCommand;

pub(crate) use util::*;
