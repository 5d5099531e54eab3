pub mod admin;
pub mod guard;
pub mod session;
pub mod user;

pub use admin::*;
pub use guard::*;
pub use session::*;
pub use user::*;
