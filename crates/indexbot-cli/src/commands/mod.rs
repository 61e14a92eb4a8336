pub mod banned;
pub mod entry;
pub mod run;
pub mod utils;
