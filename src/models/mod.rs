pub mod events;
pub mod profile;

// Re-export commonly used types
pub use events::*;
pub use profile::UserProfile;
