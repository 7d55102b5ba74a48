pub mod codec;
pub mod tcp;

pub use codec::JsonCodec;
pub use tcp::TcpTransport;
