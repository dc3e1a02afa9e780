use csp_channel::{
    consume, merge, pipe, pipeline, produce, to_vec, Channel, ChannelState, PipelineStage,
    PutOutcome, Taken, Transform,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

async fn with_timeout<T>(fut: impl std::future::Future<Output = T>) -> T {
    timeout(Duration::from_secs(2), fut)
        .await
        .expect("operation timed out")
}

#[tokio::test]
async fn unbuffered_put_pairs_with_take() {
    let channel = Channel::<u32>::unbounded();
    let producer = channel.clone();
    tokio::spawn(async move {
        producer.put(7).await;
    });

    match with_timeout(channel.take()).await {
        Taken::Value(v) => assert_eq!(v, 7),
        Taken::Done => panic!("expected a value"),
    }
}

#[tokio::test]
async fn close_then_take_resolves_done() {
    let channel = Channel::<u32>::unbounded();
    channel.close(false);
    assert_eq!(with_timeout(channel.take()).await, Taken::Done);
}

#[tokio::test]
async fn put_after_close_is_rejected() {
    let channel = Channel::<u32>::unbounded();
    channel.close(false);
    let outcome = with_timeout(channel.put(1)).await;
    assert_eq!(outcome, PutOutcome::Done);
}

#[tokio::test]
async fn bounded_zero_capacity_is_an_error() {
    assert!(Channel::<u32>::bounded(0).is_err());
}

#[tokio::test]
async fn bounded_channel_buffers_up_to_capacity() {
    let channel = Channel::<u32>::bounded(2).unwrap();
    let producer = channel.clone();
    tokio::spawn(async move {
        for i in 0..5 {
            producer.put(i).await;
        }
        producer.close(false);
    });

    let mut received = Vec::new();
    loop {
        match with_timeout(channel.take()).await {
            Taken::Value(v) => received.push(v),
            Taken::Done => break,
        }
    }
    assert_eq!(received, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn map_transform_drops_none() {
    let transform = Transform::map(|n: i32| async move { if n % 2 == 0 { Some(n) } else { None } });
    let channel = Channel::unbounded_with(transform);
    let producer = channel.clone();
    tokio::spawn(async move {
        for i in 0..6 {
            producer.put(i).await;
        }
        producer.close(false);
    });

    let received = with_timeout(to_vec(&channel)).await;
    assert_eq!(received, vec![0, 2, 4]);
}

#[tokio::test]
async fn expand_transform_fans_one_put_into_many_takes() {
    let transform = Transform::expand(|n: u32, sink| async move {
        for i in 0..n {
            sink.push(i);
        }
    });
    let channel = Channel::unbounded_with(transform);
    let producer = channel.clone();
    tokio::spawn(async move {
        producer.put(3).await;
        producer.close(false);
    });

    let received = with_timeout(to_vec(&channel)).await;
    assert_eq!(received, vec![0, 1, 2]);
}

#[tokio::test]
async fn expand_transform_to_empty_sequence_resolves_put_without_a_value() {
    let transform = Transform::expand(|_: u32, _sink| async move {});
    let channel = Channel::unbounded_with(transform);

    let producer = channel.clone();
    let put_handle = tokio::spawn(async move { producer.put(0).await });

    // A second, ordinary value must still reach a consumer even though the
    // first put's expansion produced nothing.
    let producer2 = channel.clone();
    tokio::spawn(async move {
        producer2.put(9).await;
        producer2.close(false);
    });

    let outcome = with_timeout(put_handle).await.unwrap();
    assert_eq!(outcome, PutOutcome::Accepted);

    let received = with_timeout(to_vec(&channel)).await;
    assert_eq!(received, vec![9]);
}

#[tokio::test]
async fn tail_values_drain_after_close_but_before_ended() {
    let channel = Channel::<&'static str>::unbounded();
    let producer = channel.clone();
    tokio::spawn(async move {
        producer.put("first").await;
    });
    // Register the tail before close, per spec.md §4.8: tails are only
    // actually delivered once the channel is no longer Open.
    let tail_channel = channel.clone();
    let tail_handle = tokio::spawn(async move { tail_channel.tail("last").await });

    assert_eq!(with_timeout(channel.take()).await, Taken::Value("first"));
    channel.close(false);

    assert_eq!(with_timeout(channel.take()).await, Taken::Value("last"));
    assert_eq!(with_timeout(tail_handle).await.unwrap(), PutOutcome::Accepted);
    assert_eq!(with_timeout(channel.take()).await, Taken::Done);
}

#[tokio::test]
async fn done_resolves_once_channel_is_fully_drained() {
    let channel = Channel::<u32>::unbounded();
    let producer = channel.clone();
    tokio::spawn(async move {
        producer.put(1).await;
        producer.close(false);
    });

    let done_channel = channel.clone();
    let done_handle = tokio::spawn(async move { done_channel.done().await });

    assert_eq!(with_timeout(channel.take()).await, Taken::Value(1));
    with_timeout(done_handle).await.unwrap();
    assert_eq!(channel.state(), ChannelState::Ended);
}

#[tokio::test]
async fn from_iter_seeds_a_closed_buffered_channel() {
    let channel = Channel::from_iter(vec![1, 2, 3], false);
    let received = with_timeout(to_vec(&channel)).await;
    assert_eq!(received, vec![1, 2, 3]);
    assert_eq!(channel.state(), ChannelState::Ended);
}

#[tokio::test]
async fn pipe_forwards_values_and_propagates_close() {
    let source = Channel::<u32>::unbounded();
    let dest = Channel::<u32>::unbounded();
    let _cancel = pipe(&source, dest.clone());

    let producer = source.clone();
    tokio::spawn(async move {
        for i in 0..4 {
            producer.put(i).await;
        }
        producer.close(true);
    });

    let received = with_timeout(to_vec(&dest)).await;
    assert_eq!(received, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn merge_fans_multiple_sources_into_one_destination() {
    let a = Channel::<u32>::unbounded();
    let b = Channel::<u32>::unbounded();
    let dest = merge(vec![a.clone(), b.clone()]);

    let pa = a.clone();
    tokio::spawn(async move {
        pa.put(1).await;
        pa.close(false);
    });
    let pb = b.clone();
    tokio::spawn(async move {
        pb.put(2).await;
        pb.close(false);
    });

    let mut received = with_timeout(to_vec(&dest)).await;
    received.sort_unstable();
    assert_eq!(received, vec![1, 2]);
}

#[tokio::test]
async fn pipeline_chains_transforms_head_to_tail() {
    let (head, tail) = pipeline(vec![
        PipelineStage::Transform(Transform::map(|n: i32| async move { Some(n + 1) })),
        PipelineStage::Transform(Transform::map(|n: i32| async move { Some(n * 2) })),
    ]);

    head.put(3).await;
    assert_eq!(with_timeout(tail.take()).await, Taken::Value(8));
}

#[tokio::test]
async fn produce_and_consume_drive_a_channel_end_to_end() {
    let channel = Channel::<u32>::unbounded();
    let counter = Arc::new(AtomicUsize::new(0));

    let mut n = 0u32;
    let _producer = produce(channel.clone(), move || {
        n += 1;
        let value = n;
        async move {
            if value <= 5 {
                Some(value)
            } else {
                None
            }
        }
    });

    let seen = Arc::clone(&counter);
    let _consumer = consume(channel.clone(), move |v: u32| {
        let seen = Arc::clone(&seen);
        async move {
            seen.fetch_add(v as usize, Ordering::SeqCst);
            Ok::<(), std::convert::Infallible>(())
        }
    });

    with_timeout(channel.done()).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1 + 2 + 3 + 4 + 5);
}
