//! Minimal discrete-event engine.
//!
//! Events carry a virtual timestamp and are broadcast, in time order, to every
//! registered [`Agent`]. Agents answer with a [`Response`] holding follow-up
//! events, which are queued for the current or a later time. Events sharing a
//! timestamp are delivered in the order they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Event<T> {
    t: usize,
    seq: u64,
    data: T,
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.t == other.t && self.seq == other.seq
    }
}

impl<T> Eq for Event<T> {}

impl<T> Ord for Event<T> {
    // BinaryHeap is a max-heap: reverse so the earliest (t, seq) pops first
    fn cmp(&self, other: &Self) -> Ordering {
        other.t.cmp(&self.t).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Follow-up events produced by an agent while handling an event
pub struct Response<T> {
    events: Vec<(usize, T)>,
}

impl<T> Response<T> {
    pub fn new() -> Response<T> {
        Response { events: Vec::new() }
    }

    pub fn event(t: usize, data: T) -> Response<T> {
        Response {
            events: vec![(t, data)],
        }
    }

    pub fn events(events: Vec<(usize, T)>) -> Response<T> {
        Response { events }
    }
}

impl<T> Default for Response<T> {
    fn default() -> Self {
        Response::new()
    }
}

/// Participant in an [`EventLoop`]
///
/// `T` is the event type, `S` the observable stats collected at the end of a run.
pub trait Agent<T, S> {
    fn act(&mut self, _current_t: usize, _data: &T) -> Response<T> {
        Response::new()
    }

    fn stats(&self) -> S;
}

pub struct EventLoop<T, S> {
    queue: BinaryHeap<Event<T>>,
    current_t: usize,
    next_seq: u64,
    agents: Vec<Box<dyn Agent<T, S>>>,
}

impl<T, S> EventLoop<T, S> {
    pub fn new(events: Vec<(usize, T)>, agents: Vec<Box<dyn Agent<T, S>>>) -> EventLoop<T, S> {
        let mut event_loop = EventLoop {
            queue: BinaryHeap::new(),
            current_t: 0,
            next_seq: 0,
            agents,
        };
        for (t, data) in events {
            event_loop.schedule(t, data);
        }
        event_loop
    }

    /// Queue an event. Events in the past are clamped to the current time.
    pub fn schedule(&mut self, t: usize, data: T) {
        let t = t.max(self.current_t);
        self.queue.push(Event {
            t,
            seq: self.next_seq,
            data,
        });
        self.next_seq += 1;
    }

    pub fn current_t(&self) -> usize {
        self.current_t
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn broadcast(&mut self) {
        let Some(event) = self.queue.pop() else {
            return;
        };
        self.current_t = event.t;
        let mut follow_ups = Vec::new();
        for agent in &mut self.agents {
            let response = agent.act(self.current_t, &event.data);
            follow_ups.extend(response.events);
        }
        for (t, data) in follow_ups {
            self.schedule(t, data);
        }
    }

    /// Process events until the queue is empty or the next event is after `until`
    pub fn run(&mut self, until: usize) {
        while let Some(next) = self.queue.peek() {
            if next.t > until {
                break;
            }
            self.broadcast();
        }
    }

    pub fn stats(&self) -> Vec<S> {
        self.agents.iter().map(|agent| agent.stats()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo {
        seen: Vec<(usize, u8)>,
    }

    impl Agent<u8, Vec<(usize, u8)>> for Echo {
        fn act(&mut self, current_t: usize, data: &u8) -> Response<u8> {
            self.seen.push((current_t, *data));
            if *data == 1 {
                // re-arm once, five units later
                return Response::event(current_t + 5, 2);
            }
            Response::new()
        }

        fn stats(&self) -> Vec<(usize, u8)> {
            self.seen.clone()
        }
    }

    fn echo_loop(events: Vec<(usize, u8)>) -> EventLoop<u8, Vec<(usize, u8)>> {
        let agents: Vec<Box<dyn Agent<u8, Vec<(usize, u8)>>>> =
            vec![Box::new(Echo { seen: Vec::new() })];
        EventLoop::new(events, agents)
    }

    #[test]
    fn min_queue() {
        let mut queue = BinaryHeap::<Event<u8>>::new();
        queue.push(Event { t: 2, seq: 0, data: 2 });
        queue.push(Event { t: 1, seq: 1, data: 1 });
        assert_eq!(queue.peek().map(|e| e.data), Some(1));
    }

    #[test]
    fn same_time_events_keep_schedule_order() {
        let mut event_loop = echo_loop(vec![(3, 7), (3, 8), (3, 9)]);
        event_loop.run(10);
        assert_eq!(event_loop.stats()[0], vec![(3, 7), (3, 8), (3, 9)]);
    }

    #[test]
    fn follow_up_events_are_delivered() {
        let mut event_loop = echo_loop(vec![(1, 1)]);
        event_loop.run(100);
        assert_eq!(event_loop.stats()[0], vec![(1, 1), (6, 2)]);
        assert_eq!(event_loop.current_t(), 6);
    }

    #[test]
    fn run_stops_at_horizon() {
        let mut event_loop = echo_loop(vec![(1, 1)]);
        event_loop.run(5);
        assert_eq!(event_loop.stats()[0], vec![(1, 1)]);
        assert_eq!(event_loop.pending(), 1);

        event_loop.run(6);
        assert_eq!(event_loop.pending(), 0);
    }

    #[test]
    fn past_events_are_clamped_to_now() {
        let mut event_loop = echo_loop(vec![(4, 0)]);
        event_loop.run(4);
        event_loop.schedule(1, 3);
        event_loop.run(4);
        assert_eq!(event_loop.stats()[0], vec![(4, 0), (4, 3)]);
    }

    #[test]
    fn empty_loop_is_idle() {
        let mut event_loop = echo_loop(vec![]);
        event_loop.run(1_000);
        assert_eq!(event_loop.current_t(), 0);
        assert!(event_loop.stats()[0].is_empty());
    }
}
