pub mod analytics;
pub mod contact;
pub mod sessions;
pub mod testimonials;
pub mod users;

pub use analytics::*;
pub use contact::*;
pub use sessions::*;
pub use testimonials::*;
pub use users::*;
