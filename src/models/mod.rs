pub mod appointment;
pub mod doctor;
pub mod enums;
pub mod message;
pub mod notification;
pub mod rating;
pub mod user;

pub use appointment::*;
pub use doctor::*;
pub use enums::*;
pub use message::*;
pub use notification::*;
pub use rating::*;
pub use user::*;
