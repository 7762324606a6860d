//! Microsoft Graph storage collaborator: token acquisition, site and drive
//! resolution, and workbook download/upload. Failures propagate unchanged to
//! the caller; there is no retry here.

mod auth;
mod client;

pub use auth::acquire_token;
pub use client::SharePointClient;

pub(crate) const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";
