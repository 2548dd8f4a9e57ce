pub mod appointment;
pub mod case;
pub mod constitution;
pub mod document;
pub mod notification;
pub mod user;

pub use appointment::*;
pub use case::*;
pub use constitution::*;
pub use document::*;
pub use notification::*;
pub use user::*;
