//! Block nesting and name visibility while rewriting

use super::segments::Word;
use std::collections::{BTreeMap, BTreeSet};

/// Keyword that opens a block closed by `end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Opener {
    /// `def`, `test`, `bench`: a fresh name scope
    Function,
    /// `fn`: a closure scope that sees enclosing names
    Lambda,
    /// `if`, `while`, `for`, `spawn`, `parallel`, `rescue`
    Plain,
}

impl Opener {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "def" | "test" | "bench" => Some(Opener::Function),
            "fn" => Some(Opener::Lambda),
            "if" | "while" | "for" | "spawn" | "parallel" | "rescue" => Some(Opener::Plain),
            _ => None,
        }
    }
}

/// Block boundary seen on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockEvent {
    /// Opener keyword at byte offset
    Open(Opener, usize),
    /// `end`
    Close,
}

/// Counts block openers against `end`
#[derive(Debug, Default)]
pub(crate) struct BlockTracker {
    stack: Vec<Opener>,
}

impl BlockTracker {
    /// Feed the words of one line, returning the boundaries in order
    pub fn observe(&mut self, words: &[Word<'_>]) -> Vec<BlockEvent> {
        let mut events = Vec::new();
        for word in words {
            if word.text == "end" {
                // A stray `end` is the parser's to report
                if self.stack.pop().is_some() {
                    events.push(BlockEvent::Close);
                }
            } else if let Some(opener) = Opener::from_word(word.text) {
                self.stack.push(opener);
                events.push(BlockEvent::Open(opener, word.start));
            }
        }
        events
    }

    /// Whether any enclosing block is a function body
    pub fn in_function(&self) -> bool {
        self.stack.contains(&Opener::Function)
    }
}

#[derive(Debug, Default)]
struct Frame {
    names: BTreeSet<String>,
    /// Closure frames see the frame below
    transparent: bool,
}

/// Variable and callable visibility for one compile unit
#[derive(Debug)]
pub(crate) struct Scopes {
    frames: Vec<Frame>,
    /// Open blocks that own a frame, parallel to the tracker stack
    owners: Vec<bool>,
    /// Function name to the preprocessed line index of its first `def`
    defs: BTreeMap<String, usize>,
    /// Always-callable names
    builtins: BTreeSet<String>,
}

impl Scopes {
    pub fn new(defs: BTreeMap<String, usize>, builtins: BTreeSet<String>) -> Self {
        Scopes {
            frames: vec![Frame::default()],
            owners: Vec::new(),
            defs,
            builtins,
        }
    }

    /// Apply a block boundary reported by [`BlockTracker::observe`]
    pub fn apply(&mut self, event: BlockEvent) {
        match event {
            BlockEvent::Open(opener, _) => {
                let owns = matches!(opener, Opener::Function | Opener::Lambda);
                if owns {
                    self.frames.push(Frame {
                        names: BTreeSet::new(),
                        transparent: opener == Opener::Lambda,
                    });
                }
                self.owners.push(owns);
            }
            BlockEvent::Close => {
                if self.owners.pop() == Some(true) && self.frames.len() > 1 {
                    self.frames.pop();
                }
            }
        }
    }

    /// Record a variable in the innermost frame
    pub fn declare(&mut self, name: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.names.insert(name.to_string());
        }
    }

    /// Whether `name` is a visible variable
    pub fn is_variable(&self, name: &str) -> bool {
        for frame in self.frames.iter().rev() {
            if frame.names.contains(name) {
                return true;
            }
            if !frame.transparent {
                return false;
            }
        }
        false
    }

    /// Whether `name` can be called at preprocessed line `line`
    ///
    /// Top level sees a `def` only after its line; function bodies see all.
    pub fn is_callable(&self, name: &str, line: usize, tracker: &BlockTracker) -> bool {
        if self.builtins.contains(name) {
            return true;
        }
        match self.defs.get(name) {
            Some(def_line) => tracker.in_function() || *def_line < line,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::segments::words;

    #[test]
    fn test_tracker_counts_openers() {
        let mut tracker = BlockTracker::default();
        tracker.observe(&words("def f(x)"));
        tracker.observe(&words("  if x"));
        assert_eq!(tracker.stack.len(), 2);
        assert!(tracker.in_function());
        let events = tracker.observe(&words("  y = fn(a) a end"));
        assert_eq!(events.len(), 2);
        tracker.observe(&words("  end"));
        tracker.observe(&words("end"));
        assert_eq!(tracker.stack.len(), 0);
    }

    #[test]
    fn test_keywords_in_strings_do_not_count() {
        let mut tracker = BlockTracker::default();
        tracker.observe(&words(r#"puts("if while def")"#));
        assert_eq!(tracker.stack.len(), 0);
    }

    #[test]
    fn test_function_scope_hides_outer_names() {
        let mut tracker = BlockTracker::default();
        let mut scopes = Scopes::new(BTreeMap::new(), BTreeSet::new());
        scopes.declare("outer");
        for event in tracker.observe(&words("def f()")) {
            scopes.apply(event);
        }
        assert!(!scopes.is_variable("outer"));
        for event in tracker.observe(&words("  g = fn()")) {
            scopes.apply(event);
        }
        scopes.declare("inner");
        for event in tracker.observe(&words("  end")) {
            scopes.apply(event);
        }
        assert!(!scopes.is_variable("inner"));
        for event in tracker.observe(&words("end")) {
            scopes.apply(event);
        }
        assert!(scopes.is_variable("outer"));
    }

    #[test]
    fn test_positional_callables() {
        let defs = BTreeMap::from([("greet".to_string(), 5)]);
        let scopes = Scopes::new(defs, BTreeSet::new());
        let top = BlockTracker::default();
        assert!(!scopes.is_callable("greet", 2, &top));
        assert!(scopes.is_callable("greet", 9, &top));

        let mut inside = BlockTracker::default();
        inside.observe(&words("def other()"));
        assert!(scopes.is_callable("greet", 2, &inside));
    }
}
