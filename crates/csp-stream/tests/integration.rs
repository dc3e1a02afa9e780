use csp_channel::{Channel, Taken, Transform};
use csp_stream::{ChannelSink, ChannelStream};
use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;

#[tokio::test]
async fn stream_yields_values_in_order_then_ends() {
    let channel = Channel::<u32>::unbounded();
    let producer = channel.clone();
    tokio::spawn(async move {
        for i in 0..5 {
            producer.put(i).await;
        }
        producer.close(false);
    });

    let mut stream = ChannelStream::new(channel);
    let mut received = Vec::new();
    while let Some(v) = stream.next().await {
        received.push(v);
    }
    assert_eq!(received, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn stream_respects_transforms() {
    let transform = Transform::map(|n: i32| async move { if n >= 0 { Some(n * 2) } else { None } });
    let channel = Channel::unbounded_with(transform);
    let producer = channel.clone();
    tokio::spawn(async move {
        for i in [-1, 1, -2, 2] {
            producer.put(i).await;
        }
        producer.close(false);
    });

    let mut stream = ChannelStream::new(channel);
    let mut received = Vec::new();
    while let Some(v) = stream.next().await {
        received.push(v);
    }
    assert_eq!(received, vec![2, 4]);
}

#[tokio::test]
async fn sink_send_is_visible_to_a_direct_take() {
    let channel = Channel::<&'static str>::unbounded();
    let mut sink = ChannelSink::new(channel.clone());

    sink.send("hello").await.unwrap();
    assert_eq!(channel.take().await, Taken::Value("hello"));

    sink.close().await.unwrap();
    assert_eq!(channel.take().await, Taken::Done);
}

#[tokio::test]
async fn sink_send_all_forwards_every_item_to_a_stream() {
    let channel = Channel::<i32>::unbounded();
    let mut sink = ChannelSink::new(channel.clone());
    let mut stream = ChannelStream::new(channel.clone());

    let items = vec![1, 2, 3];
    tokio::spawn(async move {
        let mut source = futures_util::stream::iter(items.into_iter().map(Ok));
        sink.send_all(&mut source).await.unwrap();
        sink.close().await.unwrap();
    });

    let mut received = Vec::new();
    while let Some(v) = stream.next().await {
        received.push(v);
    }
    assert_eq!(received, vec![1, 2, 3]);
}
