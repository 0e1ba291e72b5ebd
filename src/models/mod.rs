pub mod enums;
pub mod conversation;
pub mod doctor;
pub mod appointment;
pub mod report;

pub use enums::*;
pub use conversation::*;
pub use doctor::*;
pub use appointment::*;
pub use report::*;
