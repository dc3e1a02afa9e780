//! Property-based tests for the channel's core ordering and lifecycle
//! invariants, mirroring the style (not the scenarios) of the ring
//! buffer's own `property_tests.rs`.

use csp_channel::{to_vec, Channel, Taken};
use proptest::prelude::*;

fn fifo_preserved(values: Vec<i32>, capacity: Option<usize>) -> Result<(), TestCaseError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();

    rt.block_on(async {
        let channel = match capacity {
            Some(cap) if cap > 0 => Channel::bounded(cap).unwrap(),
            _ => Channel::unbounded(),
        };
        let producer = channel.clone();
        let expected = values.clone();
        tokio::spawn(async move {
            for v in values {
                producer.put(v).await;
            }
            producer.close(false);
        });

        let received = to_vec(&channel).await;
        prop_assert_eq!(received, expected);
        Ok(())
    })
}

proptest! {
    #[test]
    fn unbuffered_channel_preserves_fifo_order(values in proptest::collection::vec(any::<i32>(), 0..64)) {
        fifo_preserved(values, None)?;
    }

    #[test]
    fn bounded_channel_preserves_fifo_order(
        values in proptest::collection::vec(any::<i32>(), 0..64),
        capacity in 1usize..8,
    ) {
        fifo_preserved(values, Some(capacity))?;
    }

    #[test]
    fn close_then_take_is_always_eventually_done(n in 0u32..16) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let channel = Channel::<u32>::unbounded();
            let producer = channel.clone();
            tokio::spawn(async move {
                for i in 0..n {
                    producer.put(i).await;
                }
                producer.close(false);
            });

            let mut count = 0;
            loop {
                match channel.take().await {
                    Taken::Value(_) => count += 1,
                    Taken::Done => break,
                }
            }
            prop_assert_eq!(count, n);
            Ok(())
        })?;
    }
}
