pub mod error;
pub mod requests;
pub mod responses;


pub use error::{FailureKind, NavError, Result};
pub use requests::{MethodName, Request, RequestId, RpcArgs};
pub use responses::{ErrorCode, Response, RpcResult};
