//! Call-stack reconstruction from a flat event stream.
//!
//! Every thread gets its own stack of in-flight calls. START/RESUME push a
//! new call record, RETURN/YIELD/THROW/UNWIND pop it and settle its timing:
//!
//! ```text
//! total     = end - start
//! exclusive = total - time spent in direct children
//! ```
//!
//! The child's total is charged to the caller left on top of the stack.

use super::events::{Event, EventKey};
use super::thread_parent::{NearestPriorThread, ParentThreadStrategy};
use crate::utils::config::EPSILON;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};

/// Index of a call record inside a reconstruction
pub type RecordId = usize;

/// One logical invocation of a function
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub start_time: f64,

    /// Set once the call has returned or unwound
    pub end_time: Option<f64>,

    /// Keys on the stack when the call started, oldest first
    pub trace: Vec<EventKey>,

    /// Inclusive time of direct children
    pub nested_time: f64,

    pub exclusive_time: f64,

    pub inclusive_time: f64,

    pub exceptions: Vec<String>,
}

impl CallRecord {
    fn open(start_time: f64, trace: Vec<EventKey>) -> Self {
        Self {
            start_time,
            end_time: None,
            trace,
            nested_time: 0.0,
            exclusive_time: 0.0,
            inclusive_time: 0.0,
            exceptions: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.end_time.is_some()
    }

    /// Close the call and return its raw total duration
    fn finish(&mut self, end_time: f64) -> f64 {
        let total = end_time - self.start_time;
        self.inclusive_time = total.max(EPSILON);
        self.exclusive_time = (total - self.nested_time).clamp(EPSILON, self.inclusive_time);
        self.end_time = Some(end_time);
        total
    }
}

#[derive(Debug, Clone)]
struct Frame {
    key: EventKey,
    record: RecordId,
}

/// Call stack and inferred parent of one traced thread
#[derive(Debug, Clone, Default)]
pub struct ThreadState {
    stack: Vec<Frame>,
    parent: Option<String>,
    initial_stack: Vec<EventKey>,
}

impl ThreadState {
    /// Thread this one inherited its starting stack from
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Stack copied from the parent when the thread was first seen
    pub fn initial_stack(&self) -> &[EventKey] {
        &self.initial_stack
    }

    /// Keys currently on the stack, oldest first
    pub fn stack_keys(&self) -> Vec<EventKey> {
        self.stack.iter().map(|frame| frame.key.clone()).collect()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Single reconstruction pass over an event log
///
/// Owns every piece of mutable state of the pass; nothing outlives it
/// except the returned [`Reconstruction`].
pub struct Reconstructor {
    strategy: Box<dyn ParentThreadStrategy>,
    records: Vec<CallRecord>,
    buckets: Vec<(EventKey, Vec<RecordId>)>,
    bucket_index: HashMap<EventKey, usize>,
    threads: BTreeMap<String, ThreadState>,
    call_counts: HashMap<String, u64>,
    unmatched_events: usize,
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconstructor {
    pub fn new() -> Self {
        Self {
            strategy: Box::new(NearestPriorThread),
            records: Vec::new(),
            buckets: Vec::new(),
            bucket_index: HashMap::new(),
            threads: BTreeMap::new(),
            call_counts: HashMap::new(),
            unmatched_events: 0,
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn ParentThreadStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Replay the whole log and hand back the finished records
    pub fn run(mut self, events: &[Event]) -> Reconstruction {
        debug!("Reconstructing call stacks from {} events", events.len());

        for (index, event) in events.iter().enumerate() {
            if event.kind.is_entry() {
                self.enter(event, &events[..index]);
            } else {
                self.exit(event);
            }
        }

        let reconstruction = Reconstruction {
            records: self.records,
            buckets: self.buckets,
            bucket_index: self.bucket_index,
            threads: self.threads,
            call_counts: self.call_counts,
            unmatched_events: self.unmatched_events,
        };

        info!(
            "Reconstructed {} completed calls across {} threads ({} still open, {} unmatched exits)",
            reconstruction.completed_count(),
            reconstruction.threads.len(),
            reconstruction.open_count(),
            reconstruction.unmatched_events
        );

        reconstruction
    }

    fn enter(&mut self, event: &Event, history: &[Event]) {
        let thread_id = event.thread_id();
        if !self.threads.contains_key(thread_id) {
            let state = self.spawn_thread(thread_id, history);
            self.threads.insert(thread_id.to_string(), state);
        }

        let Some(state) = self.threads.get_mut(thread_id) else {
            return;
        };

        let trace = state.stack.iter().map(|frame| frame.key.clone()).collect();
        self.records.push(CallRecord::open(event.timestamp, trace));
        let record = self.records.len() - 1;

        state.stack.push(Frame {
            key: event.key.clone(),
            record,
        });

        let bucket = match self.bucket_index.get(&event.key) {
            Some(&bucket) => bucket,
            None => {
                self.buckets.push((event.key.clone(), Vec::new()));
                self.bucket_index
                    .insert(event.key.clone(), self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };
        self.buckets[bucket].1.push(record);

        *self
            .call_counts
            .entry(event.key.function.clone())
            .or_insert(0) += 1;
    }

    /// Create the state of a thread seen for the first time
    ///
    /// The inherited stack is a value copy: the child finishing a seeded
    /// frame settles its own copy of the record and never the parent's.
    fn spawn_thread(&mut self, thread_id: &str, history: &[Event]) -> ThreadState {
        let parent = self.strategy.infer_parent(thread_id, history);

        let parent_stack = parent
            .as_deref()
            .and_then(|p| self.threads.get(p))
            .map(|state| state.stack.clone())
            .unwrap_or_default();

        let stack: Vec<Frame> = parent_stack
            .into_iter()
            .map(|frame| {
                let copy = self.records[frame.record].clone();
                self.records.push(copy);
                Frame {
                    key: frame.key,
                    record: self.records.len() - 1,
                }
            })
            .collect();

        debug!(
            "New thread {} (parent: {}, inherited depth {})",
            thread_id,
            parent.as_deref().unwrap_or("none"),
            stack.len()
        );

        let initial_stack = stack.iter().map(|frame| frame.key.clone()).collect();
        ThreadState {
            stack,
            parent,
            initial_stack,
        }
    }

    fn exit(&mut self, event: &Event) {
        let frame = self
            .threads
            .get_mut(event.thread_id())
            .and_then(|state| state.stack.pop());

        // Exits without an open call come from logs truncated mid-call
        let Some(frame) = frame else {
            debug!(
                "Ignoring unmatched {} for {} at {}",
                event.kind, event.key, event.timestamp
            );
            self.unmatched_events += 1;
            return;
        };

        if frame.key.function != event.key.function {
            debug!(
                "{} for {} closes open call {}",
                event.kind, event.key, frame.key
            );
        }

        let record = &mut self.records[frame.record];
        let total = record.finish(event.timestamp);
        if event.kind.is_exception() {
            let text = event
                .exception
                .clone()
                .unwrap_or_else(|| event.kind.as_str().to_string());
            record.exceptions.push(text);
        }

        if let Some(caller) = self
            .threads
            .get(event.thread_id())
            .and_then(|state| state.stack.last())
        {
            self.records[caller.record].nested_time += total;
        }
    }
}

/// Result of a reconstruction pass
#[derive(Debug, Clone)]
pub struct Reconstruction {
    records: Vec<CallRecord>,
    buckets: Vec<(EventKey, Vec<RecordId>)>,
    bucket_index: HashMap<EventKey, usize>,
    threads: BTreeMap<String, ThreadState>,
    call_counts: HashMap<String, u64>,
    unmatched_events: usize,
}

impl Reconstruction {
    /// Completed calls of one key, in start order
    pub fn calls(&self, key: &EventKey) -> Vec<&CallRecord> {
        self.bucket_index
            .get(key)
            .map(|&bucket| {
                let (_, ids) = &self.buckets[bucket];
                ids.iter()
                    .map(|&id| &self.records[id])
                    .filter(|record| record.is_complete())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every completed call with its key, grouped by key in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&EventKey, &CallRecord)> + '_ {
        self.buckets.iter().flat_map(move |(key, ids)| {
            ids.iter()
                .map(move |&id| (key, &self.records[id]))
                .filter(|(_, record)| record.is_complete())
        })
    }

    /// Keys that opened at least one call, in first-seen order
    pub fn keys(&self) -> impl Iterator<Item = &EventKey> + '_ {
        self.buckets.iter().map(|(key, _)| key)
    }

    /// Calls observed for a function name across all threads
    pub fn call_count(&self, function: &str) -> u64 {
        self.call_counts.get(function).copied().unwrap_or(0)
    }

    pub fn thread(&self, thread_id: &str) -> Option<&ThreadState> {
        self.threads.get(thread_id)
    }

    pub fn thread_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.threads.keys().map(String::as_str)
    }

    /// Exit events that found no open call
    pub fn unmatched_events(&self) -> usize {
        self.unmatched_events
    }

    pub fn completed_count(&self) -> usize {
        self.iter().count()
    }

    /// Calls still open when the log ended
    pub fn open_count(&self) -> usize {
        self.buckets
            .iter()
            .flat_map(|(_, ids)| ids.iter())
            .filter(|&&id| !self.records[id].is_complete())
            .count()
    }
}

/// Reconstruct call stacks with the default parent-thread heuristic
pub fn process(events: &[Event]) -> Reconstruction {
    Reconstructor::new().run(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::events::parse_event_log;

    fn key(s: &str) -> EventKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_single_call() {
        let events = parse_event_log(
            "PY_START,a.py:f:1:1,0.0,\n\
             PY_RETURN,a.py:f:1:1,1.0,\n",
        )
        .unwrap();
        let result = process(&events);

        let calls = result.calls(&key("a.py:f:1:1"));
        assert_eq!(calls.len(), 1);
        assert!((calls[0].exclusive_time - 1.0).abs() < 1e-12);
        assert!((calls[0].inclusive_time - 1.0).abs() < 1e-12);
        assert!(calls[0].trace.is_empty());
        assert_eq!(result.call_count("f"), 1);
    }

    #[test]
    fn test_nested_exclusive_time() {
        let events = parse_event_log(
            "PY_START,a.py:f:1:1,0.0,\n\
             PY_START,a.py:g:5:1,0.2,\n\
             PY_RETURN,a.py:g:5:1,0.5,\n\
             PY_RETURN,a.py:f:1:1,1.0,\n",
        )
        .unwrap();
        let result = process(&events);

        let f = result.calls(&key("a.py:f:1:1"))[0];
        let g = result.calls(&key("a.py:g:5:1"))[0];
        assert!((f.exclusive_time - 0.7).abs() < 1e-9);
        assert!((f.nested_time - 0.3).abs() < 1e-9);
        assert!((g.exclusive_time - 0.3).abs() < 1e-9);
        assert_eq!(g.trace, vec![key("a.py:f:1:1")]);
    }

    #[test]
    fn test_zero_duration_call_gets_epsilon() {
        let events = parse_event_log(
            "PY_START,a.py:f:1:1,2.0,\n\
             PY_RETURN,a.py:f:1:1,2.0,\n",
        )
        .unwrap();
        let result = process(&events);

        let f = result.calls(&key("a.py:f:1:1"))[0];
        assert_eq!(f.exclusive_time, EPSILON);
        assert!(f.exclusive_time <= f.inclusive_time);
    }

    #[test]
    fn test_exception_recorded_on_popped_call() {
        let events = parse_event_log(
            "PY_START,a.py:f:1:1,0.0,\n\
             PY_START,a.py:g:5:1,0.1,\n\
             PY_UNWIND,a.py:g:5:1,0.2,KeyError\n\
             PY_THROW,a.py:f:1:1,0.4,\n",
        )
        .unwrap();
        let result = process(&events);

        assert_eq!(
            result.calls(&key("a.py:g:5:1"))[0].exceptions,
            vec!["KeyError".to_string()]
        );
        assert_eq!(
            result.calls(&key("a.py:f:1:1"))[0].exceptions,
            vec!["PY_THROW".to_string()]
        );
    }

    #[test]
    fn test_unmatched_exit_is_noop() {
        let events = parse_event_log(
            "PY_RETURN,a.py:f:1:1,0.5,\n\
             PY_START,a.py:g:2:1,1.0,\n\
             PY_RETURN,a.py:g:2:1,2.0,\n\
             PY_THROW,a.py:g:2:1,3.0,Boom\n",
        )
        .unwrap();
        let result = process(&events);

        assert_eq!(result.unmatched_events(), 2);
        assert_eq!(result.completed_count(), 1);
        assert!(result.calls(&key("a.py:f:1:1")).is_empty());
        assert!(result.calls(&key("a.py:g:2:1"))[0].exceptions.is_empty());
    }

    #[test]
    fn test_open_calls_are_not_emitted() {
        let events = parse_event_log(
            "PY_START,a.py:f:1:1,0.0,\n\
             PY_START,a.py:g:2:1,0.5,\n\
             PY_RETURN,a.py:g:2:1,0.7,\n",
        )
        .unwrap();
        let result = process(&events);

        assert_eq!(result.completed_count(), 1);
        assert_eq!(result.open_count(), 1);
        assert_eq!(result.thread("1").unwrap().depth(), 1);
    }

    #[test]
    fn test_seeded_stack_is_a_copy() {
        let events = parse_event_log(
            "PY_START,a.py:main:1:1,0.0,\n\
             PY_START,a.py:work:9:2,0.1,\n\
             PY_RETURN,a.py:work:9:2,0.3,\n\
             PY_RETURN,a.py:main:1:2,0.4,\n\
             PY_RETURN,a.py:main:1:1,1.0,\n",
        )
        .unwrap();
        let result = process(&events);

        let child = result.thread("2").unwrap();
        assert_eq!(child.parent(), Some("1"));
        assert_eq!(child.initial_stack(), &[key("a.py:main:1:1")]);

        // thread 2 finished its copy of main; thread 1's record is untouched
        let main = result.calls(&key("a.py:main:1:1"));
        assert_eq!(main.len(), 1);
        assert!((main[0].exclusive_time - 1.0).abs() < 1e-9);
        assert_eq!(main[0].nested_time, 0.0);
    }

    #[test]
    fn test_recursion_keeps_start_order() {
        let events = parse_event_log(
            "PY_START,a.py:fib:3:1,0.0,\n\
             PY_START,a.py:fib:3:1,0.1,\n\
             PY_RETURN,a.py:fib:3:1,0.3,\n\
             PY_RETURN,a.py:fib:3:1,1.0,\n",
        )
        .unwrap();
        let result = process(&events);

        let calls = result.calls(&key("a.py:fib:3:1"));
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].start_time, 0.0);
        assert_eq!(calls[1].trace.len(), 1);
        assert_eq!(result.call_count("fib"), 2);
    }

    #[test]
    fn test_calls_are_looked_up_by_key() {
        let events = parse_event_log(
            "PY_START,a.py:f:1:1,0.0,\n\
             PY_RETURN,a.py:f:1:1,0.5,\n\
             PY_START,a.py:g:2:1,0.5,\n\
             PY_RETURN,a.py:g:2:1,0.75,\n\
             PY_START,a.py:f:1:1,1.0,\n\
             PY_RETURN,a.py:f:1:1,2.0,\n",
        )
        .unwrap();
        let result = process(&events);

        let keys: Vec<String> = result.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["a.py:f:1:1", "a.py:g:2:1"]);
        assert_eq!(result.calls(&key("a.py:f:1:1")).len(), 2);
        assert_eq!(result.calls(&key("a.py:f:1:1"))[1].start_time, 1.0);
        assert_eq!(result.calls(&key("a.py:g:2:1")).len(), 1);
        assert!(result.calls(&key("a.py:h:9:1")).is_empty());
    }
}
