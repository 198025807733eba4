//! Selection cursor over the candidate list of a switching session.

/// Circular index over a non-empty list.
///
/// Starts either on a given index or on "no selection" when nothing held
/// focus at invocation time. From "no selection", `next` lands on the first
/// entry and `previous` on the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCursor {
    index: Option<usize>,
    len: usize,
}

impl SelectionCursor {
    /// Create a cursor over `len` entries. An out-of-range start is treated as
    /// "no selection".
    pub fn new(len: usize, start: Option<usize>) -> Self {
        SelectionCursor {
            index: start.filter(|i| *i < len),
            len,
        }
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Advance by one with wraparound. Returns the new index.
    pub fn next(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.index = Some(match self.index {
            Some(i) => (i + 1) % self.len,
            None => 0,
        });
        self.index
    }

    /// Retreat by one with wraparound. Returns the new index.
    pub fn previous(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.index = Some(match self.index {
            Some(i) => (i + self.len - 1) % self.len,
            None => self.len - 1,
        });
        self.index
    }

    pub fn step(&mut self, backward: bool) -> Option<usize> {
        if backward {
            self.previous()
        } else {
            self.next()
        }
    }
}
