mod handler;
mod model;

pub use handler::{list_assignments, submit_assignment};
pub use model::{Assignment, AssignmentSubmission};
