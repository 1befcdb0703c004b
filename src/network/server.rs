//! TCP Server
//!
//! Accepts connections and hands each one to its own thread, subject to the
//! engine's admission counter.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{write_response, Response};
use crate::stats;

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server for authstore
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: AtomicBool,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: AtomicBool::new(false),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` is called (blocking)
    ///
    /// Waits for open connections to finish before returning.
    pub fn run(&self) -> Result<()> {
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        while !self.shutdown.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Some(worker) = self.dispatch(stream, peer) {
                        workers.push(worker);
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                }
            }

            workers.retain(|worker| !worker.is_finished());
        }

        tracing::info!("Shutting down, waiting for {} connections", workers.len());
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Connection thread panicked");
            }
        }

        Ok(())
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Admit and spawn a handler for one accepted connection
    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) -> Option<JoinHandle<()>> {
        // Accepted sockets inherit non-blocking mode from the listener on some platforms
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping {}: {}", peer, e);
            return None;
        }

        let permit = match self.engine.admission().map(|a| a.acquire_owned()) {
            Some(Err(e)) => {
                tracing::warn!("Rejecting {}: {}", peer, e);
                self.engine.counters().increment(stats::BUSY_KEY, 1);
                let _ = write_response(&mut &stream, &Response::busy(&e.to_string()));
                return None;
            }
            Some(Ok(permit)) => Some(permit),
            None => None,
        };

        let engine = Arc::clone(&self.engine);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        // The permit lives in the closure: it is released when the handler
        // returns or panics, or when the closure is dropped by a failed spawn
        let spawned = thread::Builder::new()
            .name(format!("conn-{}", peer))
            .spawn(move || {
                let _permit = permit;
                serve(stream, engine, read_ms, write_ms);
            });

        match spawned {
            Ok(worker) => Some(worker),
            Err(e) => {
                tracing::error!("Failed to spawn handler for {}: {}", peer, e);
                None
            }
        }
    }
}

fn serve(stream: TcpStream, engine: Arc<Engine>, read_ms: u64, write_ms: u64) {
    let result = Connection::new(stream, engine).and_then(|mut connection| {
        connection.set_timeouts(read_ms, write_ms)?;
        connection.handle()
    });

    if let Err(e) = result {
        tracing::debug!("Connection ended with error: {}", e);
    }
}
