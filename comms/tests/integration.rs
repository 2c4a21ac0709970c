use std::borrow::Cow;

use comms::msg::{Command, Msg};
use tokio::io;

#[tokio::test]
async fn send_recv_control() {
    let (one, two) = io::duplex(128);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    let (rx2, tx2) = io::split(two);
    let (mut rx, _) = comms::channel(rx2, tx2);

    tx.send(&Msg::Control(Command::Arrive)).await.unwrap();
    tx.send(&Msg::Control(Command::Release)).await.unwrap();

    let mut buf = Vec::new();
    let first: Msg = rx.recv_into(&mut buf).await.unwrap();
    assert!(matches!(first, Msg::Control(Command::Arrive)));

    let second: Msg = rx.recv_into(&mut buf).await.unwrap();
    assert!(matches!(second, Msg::Control(Command::Release)));
}

#[tokio::test]
async fn send_recv_err_larger_than_pipe() {
    let text = "x".repeat(4096);

    let (one, two) = io::duplex(64);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    let (rx2, tx2) = io::split(two);
    let (mut rx, _) = comms::channel(rx2, tx2);

    let msg = Msg::Err(Cow::Borrowed(&text));
    let (sent, received) = tokio::join!(tx.send(&msg), async {
        let mut buf = Vec::new();
        let msg: Msg = rx.recv_into(&mut buf).await?;
        match msg {
            Msg::Err(got) => Ok(got.len()),
            other => Err(io::Error::other(format!("unexpected {}", other.kind()))),
        }
    });

    sent.unwrap();
    assert_eq!(received.unwrap(), text.len());
}

#[tokio::test]
async fn closed_sender_yields_eof() {
    let (one, two) = io::duplex(64);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    let (rx2, tx2) = io::split(two);
    let (mut rx, _) = comms::channel(rx2, tx2);

    tx.close().await.unwrap();

    let mut buf = Vec::new();
    let err = rx.recv_into::<Msg>(&mut buf).await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[tokio::test]
async fn oversized_frame_is_rejected() {
    use tokio::io::AsyncWriteExt;

    let (mut raw, two) = io::duplex(64);
    let (rx, tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);

    raw.write_all(&u64::MAX.to_be_bytes()).await.unwrap();

    let mut buf = Vec::new();
    let err = rx.recv_into::<Msg>(&mut buf).await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
}
