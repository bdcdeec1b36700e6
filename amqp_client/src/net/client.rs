use bytes::BytesMut;
use tokio::{
    io::AsyncWriteExt,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info};

use crate::{
    api::{
        callbacks::ConnectionCallback,
        connection::{Connection, OpenConnectionArguments},
        error::Error,
        Result,
    },
    frame::{to_buffer, types::AmqpChannelId, ProtocolHeader},
};

use super::{
    reader_handler::ReaderHandler, writer_handler::WriterHandler, Command, Connector,
    TcpConnector,
};

/// Handle to a [`Connection`] running on its own tokio tasks.
///
/// # Example
/// ```no_run
/// # use amqp_client::{connection::OpenConnectionArguments, Client};
/// # #[tokio::main]
/// # async fn main() {
/// let args = OpenConnectionArguments::new("localhost", 5672, "user", "bitnami");
/// let client = Client::connect(&args).await.unwrap();
/// client.open_channel(1).await.unwrap();
/// client.disconnect().await.unwrap();
/// # }
/// ```
pub struct Client {
    command_tx: mpsc::UnboundedSender<Command>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Client {
    /// Connect over TCP and complete the handshake.
    pub async fn connect(args: &OpenConnectionArguments) -> Result<Self> {
        Self::connect_with(&TcpConnector, args).await
    }

    /// Connect over the stream returned by `connector`.
    ///
    /// Returns once `connection.open-ok` is received, or with the error
    /// that ended the handshake.
    pub async fn connect_with<C: Connector>(
        connector: &C,
        args: &OpenConnectionArguments,
    ) -> Result<Self> {
        let stream = connector
            .connect(args.get_host(), args.get_port())
            .await?;
        let (read_half, mut write_half) = tokio::io::split(stream);

        let mut header = BytesMut::new();
        to_buffer(&ProtocolHeader::default(), &mut header)?;
        write_half.write_all(&header).await?;

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let mut connection = Connection::new(args, Box::new(outgoing_tx))?;

        let (report_tx, mut report_rx) = mpsc::unbounded_channel();
        let connected_tx = report_tx.clone();
        connection.on_connection(move |_| {
            if connected_tx.send(Ok(())).is_err() {
                debug!("connect is no longer awaited");
            }
        });

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(WriterHandler::new(write_half, outgoing_rx).run_until_shutdown());
        let reader = tokio::spawn(
            ReaderHandler::new(read_half, connection, command_rx, report_tx).run_until_shutdown(),
        );

        match report_rx.recv().await {
            Some(Ok(())) => {
                info!("connected to {}:{}", args.get_host(), args.get_port());
                Ok(Self {
                    command_tx,
                    reader,
                    writer,
                })
            }
            Some(Err(err)) => Err(err),
            None => Err(Error::ConnectionOpenError(
                "connection closed during handshake".to_owned(),
            )),
        }
    }

    /// Run `f` on the task owning the connection, without waiting for it.
    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Connection) + Send + 'static,
    {
        self.command_tx.send(Box::new(f))?;
        Ok(())
    }

    /// Run `f` on the task owning the connection and wait for its result.
    pub async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.execute(move |connection| {
            if tx.send(f(connection)).is_err() {
                debug!("caller gone, discard result");
            }
        })?;
        rx.await?
    }

    pub async fn register_callback<F>(&self, callback: F) -> Result<()>
    where
        F: ConnectionCallback + 'static,
    {
        self.call(move |connection| {
            connection.register_callback(callback);
            Ok(())
        })
        .await
    }

    /// Open a channel and wait for `channel.open-ok`.
    pub async fn open_channel(&self, channel_id: AmqpChannelId) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.call(move |connection| {
            connection.channel(channel_id)?.open(move |_, _| {
                tx.send(()).ok();
            })
        })
        .await?;
        rx.await?;
        Ok(())
    }

    /// Close a channel and wait for `channel.close-ok`.
    pub async fn close_channel(&self, channel_id: AmqpChannelId) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.call(move |connection| {
            connection.channel(channel_id)?.close_gracefully(move |_, _| {
                tx.send(()).ok();
            })
        })
        .await?;
        rx.await?;
        Ok(())
    }

    /// Close the connection, wait for `connection.close-ok` and for both tasks to exit.
    pub async fn disconnect(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.call(move |connection| {
            connection.on_disconnection(move |_| {
                tx.send(()).ok();
            });
            connection.close_gracefully()
        })
        .await?;
        rx.await?;

        let Self {
            command_tx,
            reader,
            writer,
        } = self;
        drop(command_tx);
        reader
            .await
            .map_err(|err| Error::InternalChannelError(err.to_string()))?;
        writer
            .await
            .map_err(|err| Error::InternalChannelError(err.to_string()))?;
        info!("disconnected");
        Ok(())
    }
}
