pub mod admin;
pub mod options;

pub use admin::AdminState;
pub use options::{Font, Orientation, PageSize, TextColor};
