pub mod git;
pub mod http;
