// Bounded queue drop policies

use live_guide::session::{BoundedQueue, TimestampedPayload};

#[test]
fn test_drop_oldest_evicts_front_when_full() {
    let mut queue = BoundedQueue::drop_oldest(3);

    for i in 0..3 {
        assert!(queue.try_deposit(i).is_none());
    }
    assert_eq!(queue.len(), 3);

    // Fourth deposit evicts the oldest and reports it
    assert_eq!(queue.try_deposit(3), Some(0));
    assert_eq!(queue.try_deposit(4), Some(1));
    assert_eq!(queue.drop_count(), 2);

    assert_eq!(queue.drain_available(), vec![2, 3, 4]);
    assert!(queue.is_empty());
}

#[test]
fn test_drop_oldest_default_audio_capacity() {
    let mut queue = BoundedQueue::drop_oldest(5);

    for i in 0..7u8 {
        queue.try_deposit(TimestampedPayload::new(vec![i]));
    }

    assert_eq!(queue.len(), 5);
    assert_eq!(queue.drop_count(), 2);
    // Newest five survive, oldest first
    let kept: Vec<u8> = queue.drain_available().iter().map(|p| p.data()[0]).collect();
    assert_eq!(kept, vec![2, 3, 4, 5, 6]);
}

#[test]
fn test_zero_capacity_is_raised_to_one() {
    let mut queue = BoundedQueue::drop_oldest(0);
    assert_eq!(queue.capacity(), 1);

    queue.try_deposit("a");
    assert_eq!(queue.try_deposit("b"), Some("a"));
    assert_eq!(queue.pop(), Some("b"));
}

#[test]
fn test_latest_only_keeps_newest() {
    let mut queue = BoundedQueue::latest_only();
    assert_eq!(queue.capacity(), 1);

    assert!(queue.try_deposit("frame-1").is_none());
    assert_eq!(queue.try_deposit("frame-2"), Some("frame-1"));
    assert_eq!(queue.try_deposit("frame-3"), Some("frame-2"));

    assert_eq!(queue.len(), 1);
    assert_eq!(queue.drop_count(), 2);
    assert_eq!(queue.pop(), Some("frame-3"));
    assert_eq!(queue.pop(), None);
}

#[test]
fn test_clear_is_not_counted_as_drops() {
    let mut queue = BoundedQueue::drop_oldest(5);
    queue.try_deposit(1);
    queue.try_deposit(2);

    assert_eq!(queue.clear(), 2);
    assert!(queue.is_empty());
    assert_eq!(queue.drop_count(), 0);
}

#[test]
fn test_record_drop_counts_downstream_discards() {
    let mut queue: BoundedQueue<u32> = BoundedQueue::drop_oldest(2);
    queue.record_drop();
    queue.record_drop();
    assert_eq!(queue.drop_count(), 2);
}

#[test]
fn test_pop_on_empty_queue() {
    let mut queue: BoundedQueue<u32> = BoundedQueue::drop_oldest(2);
    assert_eq!(queue.pop(), None);
    assert!(queue.drain_available().is_empty());
}
