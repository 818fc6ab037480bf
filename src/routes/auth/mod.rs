mod handler;
mod model;

pub use handler::{
    login,
    logout,
    send_confirmation,
    send_otp,
    session_extend,
    session_remaining,
    verify_otp,
};
pub use model::Student;
