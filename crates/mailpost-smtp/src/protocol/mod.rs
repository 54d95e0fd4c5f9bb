//! SMTP dialog as an explicit state machine.
//!
//! [`Session::advance`] maps `(state, reply)` to the next state and an
//! [`Action`] for the driver. The session never touches the transport, so
//! every transition can be exercised without a socket.

mod session;
mod state;

pub use session::{Action, Session};
pub use state::State;
