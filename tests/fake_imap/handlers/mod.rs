//! IMAP command handlers for the fake server.
//!
//! Each handler lives in its own module and processes a single IMAP
//! command (LIST, LOGIN, LOGOUT, SELECT, UID SEARCH,
//! UID FETCH).

mod login;
mod uid_fetch;
mod uid_search;

pub use list::handle_list;
pub use login::{handle_login, login_args};
pub use logout::handle_logout;
pub use select::handle_select;
pub use uid_fetch::handle_uid_fetch;
pub use uid_search::handle_uid_search;
