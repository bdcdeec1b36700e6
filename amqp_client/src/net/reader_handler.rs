use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
};
use tracing::{debug, error, info};

use crate::{
    api::{connection::Connection, error::Error, status::Stateful, Result},
    frame::MAX_CHUNK_SIZE,
};

use super::Command;

pub(super) struct ReaderHandler<R> {
    stream: R,
    /// owned exclusively by this task, every event is processed here
    connection: Connection,
    /// commands submitted by `Client`
    command_rx: UnboundedReceiver<Command>,
    /// errors that end the task before `Client` has connected
    report_tx: UnboundedSender<Result<()>>,
}

impl<R> ReaderHandler<R>
where
    R: AsyncRead + Send + Unpin,
{
    pub fn new(
        stream: R,
        connection: Connection,
        command_rx: UnboundedReceiver<Command>,
        report_tx: UnboundedSender<Result<()>>,
    ) -> Self {
        Self {
            stream,
            connection,
            command_rx,
            report_tx,
        }
    }

    fn report(&self, err: Error) {
        // nobody listens once the client is connected
        if self.report_tx.send(Err(err)).is_err() {
            debug!("no listener for connection error");
        }
    }

    fn interrupted(&mut self, cause: String) {
        // a server may drop the socket instead of closing on refused credentials
        let error = if self.connection.is_opening() {
            Error::AuthenticationFailure(format!("link dropped during handshake, {}", cause))
        } else {
            Error::NetworkError(cause)
        };
        self.connection.on_connection_interruption();
        self.report(error);
    }

    pub async fn run_until_shutdown(mut self) {
        let mut buf = vec![0u8; MAX_CHUNK_SIZE];
        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => command(&mut self.connection),
                        None => {
                            info!("client dropped, abandon connection");
                            break;
                        }
                    }
                }
                read = self.stream.read(&mut buf) => {
                    match read {
                        Ok(0) => {
                            self.interrupted("connection reset by server".to_owned());
                            break;
                        }
                        Ok(len) => {
                            if let Err(err) = self.connection.on_read(&buf[..len]) {
                                error!("stop reading, cause: {}", err);
                                self.report(err);
                                break;
                            }
                        }
                        Err(err) => {
                            error!("socket read error: {}", err);
                            self.interrupted(err.to_string());
                            break;
                        }
                    }
                }
            }
            if self.connection.is_closed() {
                break;
            }
        }
        debug!("reader handler exits, {:?}", self.connection);
    }
}
