//! Framing over a real async byte stream.
//!
//! `tokio::io::duplex` gives us an in-memory pipe with a tiny buffer, so
//! writes get split into many small reads on the other side, which is
//! exactly the chunking behavior a TCP peer can produce.

use chatrelay_protocol::{encode_frame, ChatMessage, FrameCodec, ProtocolError, WireMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{FramedRead, FramedWrite};

fn chat(nick: &str, text: &str) -> WireMessage {
    ChatMessage::Message {
        nick: nick.into(),
        message: text.into(),
    }
    .to_wire()
}

#[tokio::test]
async fn test_framed_stream_preserves_order_across_small_reads() {
    let (client, server) = tokio::io::duplex(7);
    let mut reader = FramedRead::new(server, FrameCodec::new());
    let mut writer = FramedWrite::new(client, FrameCodec::new());

    let sent: Vec<WireMessage> = (0..20)
        .map(|i| chat("alice", &format!("message number {i}")))
        .collect();

    let to_send = sent.clone();
    let producer = tokio::spawn(async move {
        for msg in to_send {
            writer.send(msg).await.expect("send");
        }
        // Dropping the writer closes the pipe.
    });

    let mut received = Vec::new();
    while let Some(frame) = reader.next().await {
        received.push(frame.expect("valid frame"));
    }
    producer.await.unwrap();

    assert_eq!(received, sent);
}

#[tokio::test]
async fn test_framed_stream_clean_close_is_end_of_stream() {
    let (client, server) = tokio::io::duplex(64);
    let mut reader = FramedRead::new(server, FrameCodec::new());
    drop(client);

    assert!(reader.next().await.is_none());
}

#[tokio::test]
async fn test_framed_stream_close_mid_frame_is_framing_error() {
    let (mut client, server) = tokio::io::duplex(256);
    let mut reader = FramedRead::new(server, FrameCodec::new());

    let frame = encode_frame(&chat("bob", "cut short")).unwrap();
    client.write_all(&frame[..frame.len() - 5]).await.unwrap();
    drop(client);

    match reader.next().await {
        Some(Err(ProtocolError::Framing(_))) => {}
        other => panic!("expected framing error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_framed_stream_unknown_option_passes_framing() {
    // Shape checks belong to the interpreter, not the framing layer.
    let (mut client, server) = tokio::io::duplex(256);
    let mut reader = FramedRead::new(server, FrameCodec::new());

    let bogus = WireMessage::new().with("option", "bogus");
    client.write_all(&encode_frame(&bogus).unwrap()).await.unwrap();

    let decoded = reader.next().await.unwrap().unwrap();
    assert_eq!(decoded, bogus);
}
