mod contact;
mod error;
mod events;
mod health_check;
mod registrations;
mod subscribers;

pub use contact::*;
pub use error::*;
pub use events::*;
pub use health_check::*;
pub use registrations::*;
pub use subscribers::*;
