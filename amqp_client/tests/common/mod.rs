#![allow(dead_code)]
use std::{io, sync::Mutex};

use amqp_client::{
    frame::{
        types::{AmqpChannelId, FieldTable, FieldValue, LongStr},
        Frame, FrameDemultiplexer, Method, OpenOk, Start, Tune,
    },
    Connector,
};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// construct a subscriber that prints formatted traces to stdout
pub fn setup_logging() {
    // global subscriber with log level according to RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

/////////////////////////////////////////////////////////////////////////////
/// Hands out the client half of an in-memory stream, once.
pub struct DuplexConnector {
    stream: Mutex<Option<DuplexStream>>,
}

#[async_trait]
impl Connector for DuplexConnector {
    type Stream = DuplexStream;

    async fn connect(&self, _host: &str, _port: u16) -> io::Result<DuplexStream> {
        self.stream
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "already used"))
    }
}

pub fn pair() -> (DuplexConnector, Broker) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let connector = DuplexConnector {
        stream: Mutex::new(Some(client)),
    };
    let broker = Broker {
        stream: server,
        demux: FrameDemultiplexer::default(),
        buf: vec![0u8; 4096],
    };
    (connector, broker)
}

/////////////////////////////////////////////////////////////////////////////
/// Server side of the stream, driven step by step by a test.
pub struct Broker {
    stream: DuplexStream,
    demux: FrameDemultiplexer,
    buf: Vec<u8>,
}

impl Broker {
    pub async fn read_protocol_header(&mut self) -> [u8; 8] {
        let mut header = [0u8; 8];
        self.stream.read_exact(&mut header).await.unwrap();
        header
    }

    pub async fn send<F: Into<Frame>>(&mut self, channel_id: AmqpChannelId, frame: F) {
        let bytes = frame.into().encode(channel_id).unwrap();
        self.stream.write_all(&bytes).await.unwrap();
    }

    pub async fn recv(&mut self) -> (AmqpChannelId, Frame) {
        loop {
            if let Some(raw) = self.demux.next_frame().unwrap() {
                return (raw.channel(), Frame::decode(&raw).unwrap());
            }
            let len = self.stream.read(&mut self.buf).await.unwrap();
            assert!(len > 0, "client closed the stream");
            self.demux.feed(&self.buf[..len]).unwrap();
        }
    }

    /// Next method frame, skipping heartbeats.
    pub async fn recv_method(&mut self, channel_id: AmqpChannelId) -> Method {
        loop {
            match self.recv().await {
                (_, Frame::HeartBeat) => continue,
                (id, Frame::Method(method)) => {
                    assert_eq!(channel_id, id, "method {} on wrong channel", method);
                    return method;
                }
                (id, frame) => panic!("unexpected {} on channel {}", frame, id),
            }
        }
    }

    /// Bytes left unread once the client shuts its side down.
    pub async fn read_to_end(&mut self) -> usize {
        let mut rest = Vec::new();
        self.stream.read_to_end(&mut rest).await.unwrap();
        rest.len()
    }

    pub async fn start(&mut self) {
        assert_eq!(b"AMQP\x00\x00\x09\x01", &self.read_protocol_header().await);
        self.send(0, server_start()).await;
        match self.recv_method(0).await {
            Method::StartOk(start_ok) => assert_eq!("PLAIN", start_ok.mechanism()),
            other => panic!("expect start-ok, got {}", other),
        }
    }

    /// Complete the handshake with the given tuning, returns the client's reply.
    pub async fn handshake(&mut self, tune: Tune) -> Method {
        self.start().await;
        self.send(0, tune).await;
        let tune_ok = self.recv_method(0).await;
        match self.recv_method(0).await {
            Method::Open(open) => assert_eq!("/", open.virtual_host()),
            other => panic!("expect open, got {}", other),
        }
        self.send(0, OpenOk::default()).await;
        tune_ok
    }
}

pub fn server_start() -> Start {
    let mut properties = FieldTable::new();
    properties.insert(
        "product".try_into().unwrap(),
        FieldValue::S(LongStr::try_from("RabbitMQ").unwrap()),
    );
    Start::new(
        properties,
        "AMQPLAIN PLAIN".try_into().unwrap(),
        "en_US".try_into().unwrap(),
    )
}
