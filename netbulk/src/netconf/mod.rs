//! NETCONF client over SSH.
//!
//! Covers what configuration push needs: the hello exchange with
//! base:1.0/base:1.1 framing negotiation, `edit-config`, reply parsing
//! with `rpc-error` detection, and `close-session`.

mod framing;
mod reply;
mod session;

pub use framing::{FrameDecoder, Framing};
pub use reply::{RpcErrorInfo, RpcReply, ServerHello};
pub use session::NetconfSession;
