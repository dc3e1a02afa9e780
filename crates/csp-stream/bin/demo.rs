//! Demonstration of csp-stream features.
//!
//! Run with: `cargo run -p csp-stream --bin demo`

use std::time::Duration;

use csp_channel::{Channel, PutOutcome, Transform};
use csp_stream::{ChannelSink, ChannelStream};
use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use tokio::time::timeout;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== csp-stream Demo ===\n");

    demo_basic_usage().await?;
    demo_buffered_channel().await?;
    demo_transform().await?;
    demo_sink_trait().await?;
    demo_close_and_drain().await?;

    println!("\n=== All demos completed successfully! ===");
    Ok(())
}

/// Demo 1: unbuffered rendezvous, consumed as a `Stream`.
async fn demo_basic_usage() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Demo 1: Basic Usage ---");

    let channel = Channel::<u64>::unbounded();
    let producer_channel = channel.clone();

    let producer = tokio::spawn(async move {
        for i in 0..5 {
            producer_channel.put(i).await;
            println!("  Sent: {i}");
        }
        producer_channel.close(false);
    });

    let mut stream = ChannelStream::new(channel);
    while let Ok(Some(item)) = timeout(Duration::from_millis(200), stream.next()).await {
        println!("  Received: {item}");
    }

    producer.await?;
    println!("  done\n");
    Ok(())
}

/// Demo 2: a bounded channel fills up and backpressures producers.
async fn demo_buffered_channel() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Demo 2: Buffered Channel ---");

    let channel = Channel::<u64>::bounded(4)?;
    let producer_channel = channel.clone();

    let producer = tokio::spawn(async move {
        for i in 0..16 {
            producer_channel.put(i).await;
        }
        producer_channel.close(false);
    });

    let mut stream = ChannelStream::new(channel);
    let mut received = 0;
    while stream.next().await.is_some() {
        received += 1;
    }
    producer.await?;
    println!("  received {received} items through a capacity-4 buffer\n");
    Ok(())
}

/// Demo 3: a one-to-many expansion transform.
async fn demo_transform() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Demo 3: Transform ---");

    let transform = Transform::expand(|n: u32, sink| async move {
        for i in 0..n {
            sink.push(i);
        }
    });
    let channel = Channel::unbounded_with(transform);
    let producer_channel = channel.clone();

    tokio::spawn(async move {
        producer_channel.put(3).await;
        producer_channel.put(2).await;
        producer_channel.close(false);
    });

    let mut stream = ChannelStream::new(channel);
    let mut values = Vec::new();
    while let Some(v) = stream.next().await {
        values.push(v);
    }
    println!("  expanded values: {values:?}\n");
    Ok(())
}

/// Demo 4: driving the `Sink` trait directly via `SinkExt`.
async fn demo_sink_trait() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Demo 4: Sink Trait ---");

    let channel = Channel::<i32>::unbounded();
    let mut sink = ChannelSink::new(channel.clone());

    sink.send(42).await.expect("send should succeed");
    println!("  sent 42 via SinkExt::send");

    match channel.take().await {
        csp_channel::Taken::Value(v) => println!("  received via take(): {v}"),
        csp_channel::Taken::Done => println!("  channel ended unexpectedly"),
    }

    sink.close().await.expect("close should succeed");
    println!("  sink closed\n");
    Ok(())
}

/// Demo 5: `close(true)` propagating through a piped pipeline.
async fn demo_close_and_drain() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Demo 5: Close Propagation ---");

    let source = Channel::<u32>::unbounded();
    let dest = Channel::<u32>::unbounded();
    let _cancel = csp_channel::pipe(&source, dest.clone());

    let drain_dest = tokio::spawn({
        let dest = dest.clone();
        async move { csp_channel::to_vec(&dest).await }
    });

    let outcome: PutOutcome = source.put(1).await;
    println!("  put outcome while open: {}", !outcome.is_done());

    source.close(true);
    source.done().await;
    dest.done().await;
    let drained = drain_dest.await?;

    println!("  both source and dest reached Ended, dest drained {drained:?}\n");
    Ok(())
}
