//! Gateway: HTTP surface for the LINE channel.
//!
//! `POST /webhook` receives signed event batches, `POST /send-message` pushes a message
//! on demand, `GET /` answers health probes. Errors end in [`ApiError`].

mod error;
mod protocol;
mod server;

pub use error::ApiError;
pub use protocol::{ErrorBody, SendMessageRequest, SendMessageResponse};
pub use server::{router, run_gateway, GatewayState, LineWebhook};
