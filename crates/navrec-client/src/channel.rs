use navrec_common::protocol::{ErrorCode, NavError, Request, Response, Result};
use navrec_common::transport::TcpTransport;
use serde_json::Value;

/// The seam between typed service clients and the wire.
///
/// A channel sends one method call and returns the unwrapped result
/// value. The concrete implementation talks TCP to the robot; tests
/// substitute scripted fakes.
pub trait RpcChannel {
    fn call(&self, method: &str, args: Value) -> Result<Value>;
}

/// Channel to a robot over the synchronous TCP transport.
///
/// Creates a fresh connection for each request. The command line issues
/// one blocking call at a time, and per-call connections keep the channel
/// free of session state beyond the auth token.
#[derive(Clone)]
pub struct TcpChannel {
    addr: String,
    token: Option<String>,
}

impl TcpChannel {
    /// Default service port, used when the hostname has no explicit port.
    pub const DEFAULT_PORT: u16 = 4831;

    /// Creates a channel to `hostname`, appending the default port when
    /// none is given.
    pub fn new(hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        let addr = if hostname.contains(':') {
            hostname
        } else {
            format!("{}:{}", hostname, Self::DEFAULT_PORT)
        };
        Self { addr, token: None }
    }

    /// Target address, host:port.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Authenticates against the robot and stores the session token.
    ///
    /// Must be called before any service call; the token is injected into
    /// every subsequent request. An authentication failure here is fatal
    /// for the session.
    pub fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        let result = self.call_raw(
            "robot.authenticate",
            serde_json::json!({"username": username, "password": password}),
        )?;
        let token = result
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                NavError::InvalidResponse("authenticate response carries no token".to_string())
            })?;
        self.token = Some(token.to_string());
        tracing::info!(addr = %self.addr, user = username, "authenticated");
        Ok(())
    }

    /// Whether `authenticate` has succeeded on this channel.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn call_raw(&self, method: &str, args: Value) -> Result<Value> {
        let mut request = Request::new(method, args);
        if let Some(token) = &self.token {
            request = request.with_token(token.clone());
        }

        tracing::debug!(method, id = request.id, "sending request");

        let transport = TcpTransport::new()?;
        let mut stream = transport.connect(&self.addr)?;
        let response = transport.send_request(&mut stream, &request)?;
        // Connection closes here when the stream drops.

        unwrap_response(response)
    }
}

impl RpcChannel for TcpChannel {
    fn call(&self, method: &str, args: Value) -> Result<Value> {
        self.call_raw(method, args)
    }
}

/// Maps a response envelope to the result value or a typed error.
pub fn unwrap_response(response: Response) -> Result<Value> {
    if response.success {
        return response.result.ok_or_else(|| {
            NavError::InvalidResponse("missing result in success response".to_string())
        });
    }

    let message = response
        .error
        .unwrap_or_else(|| "unknown error".to_string());
    Err(match response.error_code {
        Some(ErrorCode::Unauthenticated) => NavError::Unauthenticated(message),
        Some(ErrorCode::PermissionDenied) => NavError::PermissionDenied(message),
        Some(ErrorCode::LeaseUse) => NavError::LeaseUse(message),
        Some(ErrorCode::InvalidRequest) => NavError::InvalidRequest(message),
        Some(ErrorCode::Service) | None => NavError::Service(message),
    })
}
