pub mod bootcamp;
pub mod course;
pub mod user;

pub use bootcamp::BOOTCAMPS;
pub use course::COURSES;
pub use user::USERS;

use super::schema::ResourceSchema;

/// Every collection the service owns, in dependency order.
pub static ALL: &[&ResourceSchema] = &[&USERS, &BOOTCAMPS, &COURSES];
