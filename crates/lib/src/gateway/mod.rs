//! Gateway: the webhook HTTP surface.
//!
//! One route, two methods: GET / for the verification handshake, POST / for
//! message delivery. Classified failures map to HTTP statuses at this
//! boundary and nowhere else.

mod server;

pub use server::{build_state, router, run_gateway, RelayState};
