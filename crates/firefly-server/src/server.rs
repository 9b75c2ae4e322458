//! Server lifecycle: bind, then serve until the process ends.
//!
//! Binding and serving are separate steps so startup can fail fast on a
//! bad address before anything runs in the background.

use std::net::SocketAddr;

use axum::Router;
use firefly_core::config::ServerSettings;
use tokio::net::TcpListener;

use crate::error::ServerError;

/// Bind a TCP listener for the configured host and port.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is malformed or the
/// port cannot be bound.
pub async fn bind(settings: &ServerSettings) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))
}

/// Serve `router` on an already bound listener.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] if the server hits a fatal I/O error.
pub async fn serve(listener: TcpListener, router: Router) -> Result<(), ServerError> {
    axum::serve(listener, router)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_host_is_a_bind_error() {
        let settings = ServerSettings {
            host: String::from("not an address"),
            ..ServerSettings::default()
        };
        assert!(matches!(bind(&settings).await, Err(ServerError::Bind(_))));
    }

    #[tokio::test]
    async fn port_in_use_is_a_bind_error() {
        let first = ServerSettings {
            host: String::from("127.0.0.1"),
            port: 0,
            ..ServerSettings::default()
        };
        let listener = bind(&first).await;
        assert!(listener.is_ok());
        let Ok(listener) = listener else { return };
        let Ok(addr) = listener.local_addr() else { return };

        let second = ServerSettings {
            port: addr.port(),
            ..first
        };
        assert!(matches!(bind(&second).await, Err(ServerError::Bind(_))));
    }
}
