//! Retry and Cancellation Patterns
//!
//! Walks through the common shapes of a retry job:
//! - Retrying until the callback succeeds
//! - Giving up at a deadline
//! - Cancelling from another task, with a cleanup hook
//! - Streaming lifecycle events over a channel
//!
//! Run with: cargo run --example cancel_patterns

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use steadfast::{Attempt, ChannelObserver, RetryJob, RetryNotice, RetryPolicy};

// ==================== Retry Until Success ====================

async fn example_retry_until_success() {
    println!("\n=== Example 1: Retry Until Success ===");

    let calls = Arc::new(AtomicU32::new(0));
    let job = RetryJob::new({
        let calls = calls.clone();
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                println!("  Attempt {}", n + 1);
                if n < 2 {
                    Attempt::retry(format!("connection refused ({})", n + 1))
                } else {
                    Attempt::stop()
                }
            }
        }
    })
    .with_tag("connect")
    .with_policy(RetryPolicy::new().with_backoff_unit(Duration::from_millis(50)));

    match job.run().await {
        Ok(()) => println!("Connected after {} attempts", calls.load(Ordering::SeqCst)),
        Err(e) => println!("Gave up: {}", e),
    }
}

// ==================== Deadline ====================

async fn example_deadline() {
    println!("\n=== Example 2: Deadline ===");

    let result = RetryJob::from_fn(|| Attempt::retry("service unavailable"))
        .with_tag("lookup")
        .with_timeout(Duration::from_millis(300))
        .with_policy(RetryPolicy::new().with_backoff_unit(Duration::from_millis(100)))
        .run()
        .await;

    if let Err(e) = result {
        println!("{}", e);
        println!("  last error: {:?}", e.last_error());
    }
}

// ==================== Cancellation ====================

async fn example_cancellation() {
    println!("\n=== Example 3: Cancellation ===");

    let job = RetryJob::from_fn(|| Attempt::retry("lock held".to_string()))
        .with_tag("acquire-lock")
        .with_policy(RetryPolicy::new().with_backoff_unit(Duration::from_millis(20)))
        .with_cleanup(|| {
            println!("  releasing partial lease");
            Ok(())
        });
    let handle = job.cancel_handle();
    let run = tokio::spawn(job.run());

    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("  state before cancel: {:?}", handle.state());

    let cleanup = handle.cancel().await;
    println!("  cleanup result: {:?}", cleanup);
    println!("  state after cancel: {:?}", handle.state());

    match run.await {
        Ok(Err(e)) => println!("{}", e),
        Ok(Ok(())) => println!("Finished before the cancel landed"),
        Err(e) => println!("Task panicked: {}", e),
    }
}

// ==================== Event Stream ====================

async fn example_event_stream() {
    println!("\n=== Example 4: Event Stream ===");

    let (observer, mut notices) = ChannelObserver::<&str>::channel();
    let result = RetryJob::from_fn(|| Attempt::retry("disk busy"))
        .with_tag("flush")
        .with_observer(observer)
        .with_policy(
            RetryPolicy::new()
                .with_max_attempts(3)
                .with_backoff_unit(Duration::from_millis(10)),
        )
        .run()
        .await;

    while let Ok(notice) = notices.try_recv() {
        match notice {
            RetryNotice::Started { tag } => println!("  started {:?}", tag),
            RetryNotice::AttemptFailed {
                attempt,
                error,
                next_delay,
                ..
            } => println!(
                "  attempt {} failed: {} (next delay {:?})",
                attempt, error, next_delay
            ),
            RetryNotice::Completed { attempts, .. } => {
                println!("  completed after {} attempts", attempts)
            }
            RetryNotice::Failed { error, .. } => println!("  failed: {}", error),
        }
    }
    println!("Result: {:?}", result);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    example_retry_until_success().await;
    example_deadline().await;
    example_cancellation().await;
    example_event_stream().await;
}
