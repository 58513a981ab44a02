use cmdguard::{
    Admission, Clock, ConfigurationError, CooldownBucket, CooldownConfig, ManualClock,
    TrackingSleeper,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn per_key(window_secs: u64, max_uses: usize) -> (CooldownBucket<String>, ManualClock) {
    let clock = ManualClock::new();
    let bucket = CooldownBucket::new(Duration::from_secs(window_secs), max_uses)
        .expect("valid bucket")
        .with_clock(clock.clone());
    (bucket, clock)
}

#[test]
fn construction_rejects_invalid_parameters() {
    assert_eq!(
        CooldownBucket::<String>::new(Duration::ZERO, 1).expect_err("zero window"),
        ConfigurationError::InvalidWindow(Duration::ZERO)
    );
    assert_eq!(
        CooldownBucket::<String>::new(Duration::from_secs(1), 0).expect_err("zero uses"),
        ConfigurationError::InvalidMaxUses { provided: 0 }
    );
    for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(CooldownConfig::from_secs_f64(bad, 1).is_err(), "{bad} should be rejected");
    }

    let config = CooldownConfig::from_secs_f64(2.5, 3).expect("fractional window");
    assert_eq!(config.window(), Duration::from_millis(2_500));
    assert_eq!(CooldownBucket::<String>::from_config(config).max_uses(), 3);
}

#[test]
fn window_slides_one_use_at_a_time() {
    let (bucket, clock) = per_key(10, 3);
    let key = "u1".to_string();

    // uses at t=0, t=4, t=8
    for _ in 0..3 {
        assert!(bucket.can_use(&key));
        clock.advance(Duration::from_secs(4));
    }
    // t=12: the t=0 use has expired, one slot free
    assert!(bucket.can_use(&key));
    assert!(!bucket.can_use(&key));
    // next slot frees when the t=4 use expires at t=14
    assert_eq!(bucket.remaining_wait(&key), Duration::from_secs(2));

    clock.advance(Duration::from_secs(2));
    assert_eq!(bucket.remaining_wait(&key), Duration::ZERO);
    assert!(bucket.can_use(&key));
}

#[test]
fn remaining_wait_never_reserves() {
    let (bucket, clock) = per_key(5, 1);
    let key = "u1".to_string();

    assert!(bucket.can_use(&key));
    clock.advance(Duration::from_secs(1));
    for _ in 0..10 {
        assert_eq!(bucket.remaining_wait(&key), Duration::from_secs(4));
    }

    clock.advance(Duration::from_secs(4));
    for _ in 0..10 {
        assert_eq!(bucket.remaining_wait(&key), Duration::ZERO);
    }
    assert_eq!(bucket.try_acquire(&key), Admission::Allowed { remaining: 0 });
}

#[test]
fn unseen_keys_have_no_wait() {
    let (bucket, _clock) = per_key(5, 1);
    assert_eq!(bucket.remaining_wait(&"never-used".to_string()), Duration::ZERO);
    assert_eq!(bucket.tracked_keys(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_bucket_admits_exactly_max_uses_across_tasks() {
    let (bucket, _clock) = per_key(60, 5);
    let admitted = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let bucket = bucket.clone();
            let admitted = admitted.clone();
            tokio::spawn(async move {
                if bucket.can_use(&"hot-key".to_string()) {
                    admitted.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in futures::future::join_all(handles).await {
        handle.expect("task panicked");
    }
    assert_eq!(admitted.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn acquire_wait_sleeps_for_reported_wait() {
    let (bucket, clock) = per_key(10, 1);
    let sleeper = TrackingSleeper::driving(clock.clone());
    let key = "u1".to_string();

    assert_eq!(bucket.acquire_wait(&key, &sleeper).await, 0);
    clock.advance(Duration::from_secs(3));
    assert_eq!(bucket.acquire_wait(&key, &sleeper).await, 0);

    assert_eq!(sleeper.calls(), vec![Duration::from_secs(7)]);
    assert_eq!(clock.now(), Duration::from_secs(10));
}
