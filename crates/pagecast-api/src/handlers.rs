//! Request handlers.

pub mod health;
pub mod media;
pub mod posts;
pub mod status;

pub use health::*;
pub use media::*;
pub use posts::*;
pub use status::*;
