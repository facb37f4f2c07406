mod admin;
mod login;
mod not_found;
mod page;

pub use admin::Admin;
pub use login::AdminLogin;
pub use not_found::NotFound;
pub use page::{PageQuery, PublicPage};
