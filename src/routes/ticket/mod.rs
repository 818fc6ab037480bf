mod handler;
mod model;

pub use handler::{list_tickets, submit_ticket};
pub use model::Ticket;
