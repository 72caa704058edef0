//! Feed synchronization and notification services.

pub mod notification;
pub mod usecase;

pub use notification::Notifier;
pub use usecase::UseCase;
