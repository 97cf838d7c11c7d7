//! Parent-thread inference.
//!
//! The event log carries no explicit thread-spawn events, so the parent of a
//! thread is guessed when the thread is first seen. The guess decides which
//! call stack the new thread inherits as its starting context.
//!
//! The default heuristic is approximate: it assumes the spawning thread's
//! most recent event sits right before the child's first event. Interleaved
//! or re-entrant thread creation can defeat it.

use super::events::Event;
use std::fmt;
use std::str::FromStr;

/// Strategy deciding which thread spawned a newly seen thread
pub trait ParentThreadStrategy {
    /// Infer the parent of `thread_id`
    ///
    /// `history` holds every event that precedes the thread's first
    /// START/RESUME, in log order.
    fn infer_parent(&self, thread_id: &str, history: &[Event]) -> Option<String>;
}

/// Parent is the thread of the nearest prior event from a different thread
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestPriorThread;

impl ParentThreadStrategy for NearestPriorThread {
    fn infer_parent(&self, thread_id: &str, history: &[Event]) -> Option<String> {
        history
            .iter()
            .rev()
            .find(|event| event.thread_id() != thread_id)
            .map(|event| event.thread_id().to_string())
    }
}

/// Every thread is a root thread and starts with an empty stack
#[derive(Debug, Clone, Copy, Default)]
pub struct NoParent;

impl ParentThreadStrategy for NoParent {
    fn infer_parent(&self, _thread_id: &str, _history: &[Event]) -> Option<String> {
        None
    }
}

/// Strategy selector used by configuration and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentStrategyKind {
    #[default]
    Nearest,
    None,
}

impl ParentStrategyKind {
    pub fn build(self) -> Box<dyn ParentThreadStrategy> {
        match self {
            Self::Nearest => Box::new(NearestPriorThread),
            Self::None => Box::new(NoParent),
        }
    }
}

impl FromStr for ParentStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown parent strategy '{}' (expected 'nearest' or 'none')",
                other
            )),
        }
    }
}

impl fmt::Display for ParentStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("nearest"),
            Self::None => f.write_str("none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::events::parse_event_log;

    #[test]
    fn test_nearest_prior_thread_skips_own_events() {
        let history = parse_event_log(
            "PY_START,a.py:f:1:1,0.0,\n\
             PY_START,a.py:g:2:3,0.1,\n\
             PY_RETURN,a.py:h:3:2,0.2,\n",
        )
        .unwrap();

        assert_eq!(
            NearestPriorThread.infer_parent("2", &history).as_deref(),
            Some("3")
        );
        assert_eq!(NearestPriorThread.infer_parent("9", &[]), None);
    }

    #[test]
    fn test_no_parent() {
        let history = parse_event_log("PY_START,a.py:f:1:1,0.0,\n").unwrap();
        assert_eq!(NoParent.infer_parent("2", &history), None);
    }

    #[test]
    fn test_strategy_kind_parse() {
        assert_eq!(
            "nearest".parse::<ParentStrategyKind>().unwrap(),
            ParentStrategyKind::Nearest
        );
        assert_eq!(
            "NONE".parse::<ParentStrategyKind>().unwrap(),
            ParentStrategyKind::None
        );
        assert!("random".parse::<ParentStrategyKind>().is_err());
    }
}
