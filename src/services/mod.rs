pub mod library;
pub mod naming;
pub mod search;
