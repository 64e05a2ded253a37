pub mod browser;

pub use browser::{find_hosts, Filters};
