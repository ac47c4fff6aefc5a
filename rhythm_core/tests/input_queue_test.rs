use rhythm_core::input::events::{KeyBindings, LaneInput};
use rhythm_core::input::InputQueue;
use std::thread;

#[test]
fn test_input_queue_transmission() {
    let queue = InputQueue::new();
    let sender = queue.sender();

    // Spawn a producer thread
    let handle = thread::spawn(move || {
        sender.send(LaneInput { lane: 0 }).unwrap();
        sender.send(LaneInput { lane: 3 }).unwrap();
    });

    handle.join().unwrap();

    // Consumer (main test thread)
    let received1 = queue.pop().expect("Should receive first press");
    assert_eq!(received1.lane, 0);

    let received2 = queue.pop().expect("Should receive second press");
    assert_eq!(received2.lane, 3);

    // Queue should be empty now
    assert!(queue.pop().is_none());
}

#[test]
fn test_input_queue_drain_keeps_order() {
    let queue = InputQueue::new();

    queue.push(LaneInput { lane: 2 });
    queue.push(LaneInput { lane: 1 });
    queue.push(LaneInput { lane: 2 });

    let lanes: Vec<usize> = queue.drain().into_iter().map(|i| i.lane).collect();
    assert_eq!(lanes, vec![2, 1, 2]);
    assert!(queue.drain().is_empty());
}

#[test]
fn test_input_queue_clear() {
    let queue = InputQueue::default();
    queue.push(LaneInput { lane: 0 });
    queue.push(LaneInput { lane: 1 });

    assert_eq!(queue.clear(), 2);
    assert!(queue.pop().is_none());
}

#[test]
fn test_key_bindings() {
    let keys = KeyBindings::default();

    assert_eq!(keys.lane_for_key('d'), Some(0));
    assert_eq!(keys.lane_for_key('K'), Some(3));
    assert_eq!(keys.lane_for_key('x'), None);
    assert_eq!(keys.key_for_lane(2), Some('j'));
    assert_eq!(keys.key_for_lane(4), None);
}
