/// Http protocol plumbing.
pub mod http;
