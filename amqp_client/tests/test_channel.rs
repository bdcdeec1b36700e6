use std::time::Duration;

use amqp_client::{
    connection::OpenConnectionArguments,
    frame::{
        CloseChannelOk, CloseOk, Frame, Method, OpenChannelOk, QosOk, Tune, TxSelectOk,
    },
    Client,
};
use tokio::{sync::oneshot, time};

mod common;

#[tokio::test]
async fn test_channel_lifecycle() {
    common::setup_logging();
    let (connector, mut broker) = common::pair();
    let server = tokio::spawn(async move {
        broker.handshake(Tune::new(0, 131_072, 0)).await;

        match broker.recv_method(1).await {
            Method::OpenChannel(_) => broker.send(1, OpenChannelOk::default()).await,
            other => panic!("expect channel.open, got {}", other),
        }
        match broker.recv_method(1).await {
            Method::Qos(_) => broker.send(1, QosOk).await,
            other => panic!("expect basic.qos, got {}", other),
        }
        match broker.recv_method(1).await {
            Method::TxSelect(_) => broker.send(1, TxSelectOk).await,
            other => panic!("expect tx.select, got {}", other),
        }
        match broker.recv_method(1).await {
            Method::CloseChannel(close) => {
                assert_eq!(200, close.reply_code());
                broker.send(1, CloseChannelOk).await;
            }
            other => panic!("expect channel.close, got {}", other),
        }
        match broker.recv_method(0).await {
            Method::Close(_) => broker.send(0, CloseOk).await,
            other => panic!("expect connection.close, got {}", other),
        }
    });

    let client = Client::connect_with(&connector, &OpenConnectionArguments::default())
        .await
        .unwrap();
    client.open_channel(1).await.unwrap();

    let (qos_tx, qos_rx) = oneshot::channel();
    let (select_tx, select_rx) = oneshot::channel();
    client
        .call(move |connection| {
            let mut channel = connection.channel(1)?;
            channel.qos(0, 20, false, move |_, id| {
                qos_tx.send(id).ok();
            })?;
            channel.tx_select(move |_, id| {
                select_tx.send(id).ok();
            })
        })
        .await
        .unwrap();
    assert_eq!(1, qos_rx.await.unwrap());
    assert_eq!(1, select_rx.await.unwrap());

    client.close_channel(1).await.unwrap();
    client.disconnect().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_heartbeat_sent_after_tuning() {
    let (connector, mut broker) = common::pair();
    let server = tokio::spawn(async move {
        let tune_ok = broker.handshake(Tune::new(0, 131_072, 60)).await;
        match tune_ok {
            Method::TuneOk(tune_ok) => assert_eq!(2, tune_ok.heartbeat()),
            other => panic!("expect tune-ok, got {}", other),
        }
        let (channel_id, frame) = time::timeout(Duration::from_secs(5), broker.recv())
            .await
            .unwrap();
        assert_eq!(0, channel_id);
        assert_eq!(Frame::HeartBeat, frame);
    });

    let args = OpenConnectionArguments::default().heartbeat(2).finish();
    let _client = Client::connect_with(&connector, &args).await.unwrap();
    server.await.unwrap();
}
