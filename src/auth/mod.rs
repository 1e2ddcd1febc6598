pub mod rbac;
pub mod session;

pub use rbac::Role;
pub use session::Session;
