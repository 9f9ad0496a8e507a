//! Single-instance guard.
//!
//! Holds a loopback TCP listener for the lifetime of the process; a second
//! process trying to bind the same port fails fast.

use std::net::{Ipv4Addr, SocketAddr, TcpListener};

use crate::utils::error::{AppError, Result};

#[derive(Debug)]
pub struct InstanceGuard {
    listener: TcpListener,
}

impl InstanceGuard {
    pub fn acquire(port: u16) -> Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        match TcpListener::bind(addr) {
            Ok(listener) => {
                tracing::debug!("Acquired instance lock on {}", addr);
                Ok(Self { listener })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                Err(AppError::InstanceLocked { port })
            }
            Err(e) => Err(AppError::Persistence(e)),
        }
    }

    pub fn port(&self) -> u16 {
        self.listener.local_addr().map(|a| a.port()).unwrap_or_default()
    }
}
