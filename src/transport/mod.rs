//! Transports: a single-stream line protocol and a multi-client socket
//! server, both driving the same [`crate::rpc::RpcEngine`] (§4.9).

pub mod line;
pub mod socket;

pub use line::serve_lines;
pub use socket::serve_socket;
