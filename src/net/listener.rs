//! TCP listener setup.
//!
//! # Responsibilities
//! - Bind one listener per configured address, all on the same port
//! - Accept IP literals (bracketed or not) and resolvable host names
//! - Fail startup if any address cannot be bound

use std::net::{IpAddr, SocketAddr};

use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind {
        address: String,
        port: u16,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind { address, port, source } => {
                write!(f, "Failed to bind {} port {}: {}", address, port, source)
            }
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } => Some(source),
        }
    }
}

/// Bind every address in `config.bind` on `config.port`.
pub async fn bind_all(config: &ListenerConfig) -> Result<Vec<TcpListener>, ListenerError> {
    let mut listeners = Vec::with_capacity(config.bind.len());

    for address in &config.bind {
        let listener = bind(address, config.port)
            .await
            .map_err(|source| ListenerError::Bind {
                address: address.clone(),
                port: config.port,
                source,
            })?;

        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            address: address.clone(),
            port: config.port,
            source,
        })?;
        tracing::info!(address = %local_addr, "Listener bound");

        listeners.push(listener);
    }

    Ok(listeners)
}

async fn bind(address: &str, port: u16) -> std::io::Result<TcpListener> {
    let literal = address.trim_start_matches('[').trim_end_matches(']');
    match literal.parse::<IpAddr>() {
        Ok(ip) => TcpListener::bind(SocketAddr::new(ip, port)).await,
        Err(_) => TcpListener::bind((address, port)).await,
    }
}
