// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The HTTP/1.x wire protocol: the streaming request parser and the
//! per-connection keep-alive driver, plus the accept loop that hands
//! sockets to it.

mod connection;
mod read;

pub use connection::ConnectionDriver;
pub use read::RequestParser;

use tokio::{
    net::TcpListener,
    task,
};

use std::io;
use std::sync::Arc;

/// Start the HTTP/1.1 server on the given address. Runs until the
/// process is torn down; every accepted connection gets its own task,
/// so in-flight exchanges are unaffected by slow neighbors.
pub async fn start(address: &str, driver: Arc<ConnectionDriver>) -> io::Result<()> {
    let listener = TcpListener::bind(address).await?;
    log::info!("Listening on {}", address);

    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                log::warn!("Error accepting connection: {}", error);
                continue;
            }
        };

        log::debug!("Accepted connection from {}", remote);

        let driver = Arc::clone(&driver);
        task::spawn(async move {
            driver.run(stream).await;
        });
    }
}
