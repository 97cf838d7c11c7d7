//! Event log model and deserialization.
//!
//! The collector writes one event per line:
//! `event_kind,event_key,timestamp[,exception]`
//!
//! Example: `PY_START,app/main.py:handle:42:140245,0.125,`
//! The key is `source:function:line:thread_id`. It is split from the right,
//! so source paths containing colons survive intact.

use super::schema::Uid;
use crate::utils::error::ParseError;
use log::{debug, info};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The six kinds of events emitted by the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Resume,
    Return,
    Yield,
    Throw,
    Unwind,
}

impl EventKind {
    /// Literal token used in the event log
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "PY_START",
            Self::Resume => "PY_RESUME",
            Self::Return => "PY_RETURN",
            Self::Yield => "PY_YIELD",
            Self::Throw => "PY_THROW",
            Self::Unwind => "PY_UNWIND",
        }
    }

    /// START and RESUME open a call
    pub fn is_entry(&self) -> bool {
        matches!(self, Self::Start | Self::Resume)
    }

    /// THROW and UNWIND close a call with an exception
    pub fn is_exception(&self) -> bool {
        matches!(self, Self::Throw | Self::Unwind)
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PY_START" => Ok(Self::Start),
            "PY_RESUME" => Ok(Self::Resume),
            "PY_RETURN" => Ok(Self::Return),
            "PY_YIELD" => Ok(Self::Yield),
            "PY_THROW" => Ok(Self::Throw),
            "PY_UNWIND" => Ok(Self::Unwind),
            other => Err(format!("unknown event kind '{}'", other)),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an instrumented function on a given thread
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub source: String,
    pub function: String,
    pub line: u32,
    pub thread_id: String,
}

impl EventKey {
    /// Location part of the key, thread id stripped
    pub fn uid(&self) -> Uid {
        Uid {
            source: self.source.clone(),
            function: self.function.clone(),
            line: self.line,
        }
    }
}

impl FromStr for EventKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(4, ':');
        let (Some(thread_id), Some(line), Some(function), Some(source)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(format!(
                "event key '{}' must have the form source:function:line:thread_id",
                s
            ));
        };

        if function.is_empty() {
            return Err("event key has an empty function name".to_string());
        }
        if thread_id.is_empty() {
            return Err("event key has an empty thread id".to_string());
        }

        let line = line
            .parse::<u32>()
            .map_err(|e| format!("invalid line number '{}': {}", line, e))?;

        Ok(Self {
            source: source.to_string(),
            function: function.to_string(),
            line,
            thread_id: thread_id.to_string(),
        })
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.source, self.function, self.line, self.thread_id
        )
    }
}

/// A single captured event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub key: EventKey,
    pub timestamp: f64,
    pub exception: Option<String>,
}

impl Event {
    pub fn thread_id(&self) -> &str {
        &self.key.thread_id
    }
}

/// Parse one line of the event log
///
/// `line_no` is 1-based and only used for error reporting.
pub fn parse_event_line(line_no: usize, line: &str) -> Result<Event, ParseError> {
    // The exception text is the remainder of the line and may contain commas
    let fields: Vec<&str> = line.splitn(4, ',').collect();
    if fields.len() < 3 {
        return Err(ParseError::malformed(
            line_no,
            line,
            format!("expected 3 or 4 fields, found {}", fields.len()),
        ));
    }

    let kind = fields[0]
        .trim()
        .parse::<EventKind>()
        .map_err(|e| ParseError::malformed(line_no, line, e))?;

    let key = fields[1]
        .trim()
        .parse::<EventKey>()
        .map_err(|e| ParseError::malformed(line_no, line, e))?;

    let timestamp = fields[2].trim().parse::<f64>().map_err(|e| {
        ParseError::malformed(line_no, line, format!("invalid timestamp: {}", e))
    })?;
    if !timestamp.is_finite() {
        return Err(ParseError::malformed(
            line_no,
            line,
            "timestamp is not a finite number",
        ));
    }

    let exception = fields
        .get(3)
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(str::to_string);

    Ok(Event {
        kind,
        key,
        timestamp,
        exception,
    })
}

/// Parse a whole event log
///
/// Blank lines are skipped. The first malformed line aborts the parse.
pub fn parse_event_log(text: &str) -> Result<Vec<Event>, ParseError> {
    let mut events = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        events.push(parse_event_line(index + 1, line)?);
    }

    debug!("Parsed {} events", events.len());
    Ok(events)
}

/// Read and parse an event log from disk
pub fn read_event_log(path: impl AsRef<Path>) -> Result<Vec<Event>, ParseError> {
    let path = path.as_ref();
    info!("Reading event log: {}", path.display());

    let text = std::fs::read_to_string(path)?;
    parse_event_log(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_event_with_empty_exception() {
        let event = parse_event_line(1, "PY_START,a.py:f:1:1,0.0,").unwrap();
        assert_eq!(event.kind, EventKind::Start);
        assert_eq!(event.key.source, "a.py");
        assert_eq!(event.key.function, "f");
        assert_eq!(event.key.line, 1);
        assert_eq!(event.thread_id(), "1");
        assert_eq!(event.timestamp, 0.0);
        assert!(event.exception.is_none());
    }

    #[test]
    fn test_parse_three_field_line() {
        let event = parse_event_line(1, "PY_RETURN,a.py:f:1:1,1.5").unwrap();
        assert_eq!(event.kind, EventKind::Return);
        assert_eq!(event.timestamp, 1.5);
    }

    #[test]
    fn test_parse_exception_text_keeps_commas() {
        let event =
            parse_event_line(1, "PY_UNWIND,a.py:f:1:1,2.0,ValueError: a, b").unwrap();
        assert_eq!(event.exception.as_deref(), Some("ValueError: a, b"));
    }

    #[test]
    fn test_source_with_colon() {
        let event = parse_event_line(1, r"PY_START,C:\app\main.py:run:7:99,0.5,").unwrap();
        assert_eq!(event.key.source, r"C:\app\main.py");
        assert_eq!(event.key.function, "run");
        assert_eq!(event.key.thread_id, "99");
    }

    #[test]
    fn test_wrong_field_count() {
        let err = parse_event_line(3, "PY_START,a.py:f:1:1").unwrap_err();
        match err {
            ParseError::MalformedEvent { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_timestamp() {
        assert!(parse_event_line(1, "PY_START,a.py:f:1:1,soon,").is_err());
        assert!(parse_event_line(1, "PY_START,a.py:f:1:1,NaN,").is_err());
    }

    #[test]
    fn test_unknown_kind_and_bad_key() {
        assert!(parse_event_line(1, "PY_JUMP,a.py:f:1:1,0.0,").is_err());
        assert!(parse_event_line(1, "PY_START,a.py:f:1,0.0,").is_err());
        assert!(parse_event_line(1, "PY_START,a.py:f:x:1,0.0,").is_err());
    }

    #[test]
    fn test_parse_log_skips_blank_lines_and_reports_line() {
        let log = "PY_START,a.py:f:1:1,0.0,\n\nPY_RETURN,a.py:f:1:1,1.0,\n";
        assert_eq!(parse_event_log(log).unwrap().len(), 2);

        let bad = "PY_START,a.py:f:1:1,0.0,\nPY_RETURN,a.py:f:1:1,later,\n";
        match parse_event_log(bad).unwrap_err() {
            ParseError::MalformedEvent { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_key_display_round_trip() {
        let key: EventKey = "lib/util.py:helper:12:7".parse().unwrap();
        assert_eq!(key.to_string(), "lib/util.py:helper:12:7");
        assert_eq!(key.uid().to_string(), "lib/util.py:helper:12");
    }
}
