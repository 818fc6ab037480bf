mod handler;
mod model;
mod sync;

pub use handler::{list_notifications, mark_all_read, mark_read};
pub use model::Notification;
pub use sync::sync_notifications;
