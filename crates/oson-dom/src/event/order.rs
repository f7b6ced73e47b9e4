use super::{EventKind, MAX_DEPTH};
use crate::{DomError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// `keyed` is true between a Key and the value it names.
    Object { keyed: bool },
    Array,
}

/// Enforces the event grammar on the writing side: every object value is
/// preceded by exactly one Key, containers nest and close properly, a
/// stream holds one root value and nothing follows `End`.
///
/// A Key followed directly by `EndObject` is accepted; writers drop the
/// dangling name.
#[derive(Debug, Default, Clone)]
pub(crate) struct OrderCheck {
    stack: Vec<Frame>,
    root_done: bool,
    ended: bool,
}

impl OrderCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.stack.clear();
        self.root_done = false;
        self.ended = false;
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// True once a complete root value has been seen.
    pub fn root_done(&self) -> bool {
        self.root_done
    }

    pub fn check(&mut self, kind: EventKind) -> Result<()> {
        if self.ended {
            return Err(DomError::invalid_state(format!(
                "{kind:?} event after End"
            )));
        }
        if kind.is_marker() || kind == EventKind::Error {
            return Ok(());
        }
        match kind {
            EventKind::Key => match self.stack.last_mut() {
                Some(Frame::Object { keyed }) if !*keyed => {
                    *keyed = true;
                    Ok(())
                }
                Some(Frame::Object { .. }) => Err(out_of_order("Key follows a Key")),
                _ => Err(out_of_order("Key outside an object")),
            },
            EventKind::StartObject | EventKind::StartArray | EventKind::Item => {
                self.begin_value(kind)?;
                match kind {
                    EventKind::StartObject => self.push(Frame::Object { keyed: false }),
                    EventKind::StartArray => self.push(Frame::Array),
                    _ => {
                        self.end_value();
                        Ok(())
                    }
                }
            }
            EventKind::EndObject => match self.stack.last() {
                Some(Frame::Object { .. }) => {
                    self.stack.pop();
                    self.end_value();
                    Ok(())
                }
                _ => Err(out_of_order("EndObject without a matching StartObject")),
            },
            EventKind::EndArray => match self.stack.last() {
                Some(Frame::Array) => {
                    self.stack.pop();
                    self.end_value();
                    Ok(())
                }
                _ => Err(out_of_order("EndArray without a matching StartArray")),
            },
            EventKind::End => {
                if !self.stack.is_empty() {
                    return Err(out_of_order("End inside an open container"));
                }
                self.ended = true;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn begin_value(&mut self, kind: EventKind) -> Result<()> {
        match self.stack.last() {
            Some(Frame::Object { keyed: false }) => {
                Err(out_of_order(&format!("{kind:?} inside an object without a Key")))
            }
            Some(_) => Ok(()),
            None if self.root_done => Err(out_of_order("more than one root value")),
            None => Ok(()),
        }
    }

    fn push(&mut self, frame: Frame) -> Result<()> {
        if self.stack.len() >= MAX_DEPTH {
            return Err(DomError::malformed(
                0,
                format!("nesting deeper than {MAX_DEPTH}"),
            ));
        }
        self.stack.push(frame);
        Ok(())
    }

    /// A value just completed in the current container.
    fn end_value(&mut self) {
        match self.stack.last_mut() {
            Some(Frame::Object { keyed }) => *keyed = false,
            Some(Frame::Array) => {}
            None => self.root_done = true,
        }
    }
}

fn out_of_order(msg: &str) -> DomError {
    DomError::invalid_state(format!("event out of order: {msg}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use EventKind::*;

    fn run(kinds: &[EventKind]) -> Result<()> {
        let mut check = OrderCheck::new();
        for &k in kinds {
            check.check(k)?;
        }
        Ok(())
    }

    #[test]
    fn accepts_well_formed_stream() {
        run(&[
            StartObject, Key, Item, Key, StartArray, Item, Item, EndArray, EndObject, End,
        ])
        .unwrap();
    }

    #[test]
    fn rejects_value_without_key() {
        assert!(run(&[StartObject, Item]).is_err());
        assert!(run(&[StartObject, Key, Key]).is_err());
        assert!(run(&[StartArray, Key]).is_err());
    }

    #[test]
    fn rejects_mismatched_close() {
        assert!(run(&[StartObject, EndArray]).is_err());
        assert!(run(&[StartArray, End]).is_err());
    }

    #[test]
    fn single_root_and_nothing_after_end() {
        assert!(run(&[Item, Item]).is_err());
        assert!(run(&[Item, End, Item]).is_err());
    }

    #[test]
    fn dangling_key_before_end_object_is_allowed() {
        run(&[StartObject, Key, EndObject, End]).unwrap();
    }

    #[test]
    fn markers_pass_anywhere() {
        run(&[Position, StartObject, RowSeparator, Key, Position, Item, EndObject, End]).unwrap();
    }

    #[test]
    fn depth_limit() {
        let mut kinds = vec![StartArray; MAX_DEPTH];
        assert!(run(&kinds).is_ok());
        kinds.push(StartArray);
        assert!(run(&kinds).is_err());
    }
}
