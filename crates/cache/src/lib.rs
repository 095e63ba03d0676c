pub mod layout;
pub mod store;

pub use layout::{ALIAS_KEY_PREFIX, Storage, VIDEO_KEY_PREFIX};
pub use store::{JsonStore, safe_file_name};
