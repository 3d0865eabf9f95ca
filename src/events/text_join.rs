//! Text-join heuristic
//!
//! Text deltas arriving right after tool activity tend to run into the
//! previous sentence ("...found it.Now let me"). This state decides when a
//! newline is put in front of a delta.

/// Characters after tool activity within which the uppercase rule applies
pub const JOIN_WINDOW_CHARS: usize = 20;

/// Running text-join state
#[derive(Debug, Clone, Default)]
pub struct TextJoinState {
    /// Characters emitted so far
    emitted_chars: usize,
    /// Tool activity seen since the last text delta
    after_tool: bool,
    /// Characters emitted since the last tool activity, while inside the window
    since_tool: Option<usize>,
    ends_with_newline: bool,
}

impl TextJoinState {
    /// Create fresh state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tool call or tool result
    pub fn note_tool_activity(&mut self) {
        self.after_tool = true;
        self.since_tool = Some(0);
    }

    /// Return the text to emit for this delta
    pub fn join(&mut self, text: &str) -> String {
        let out = if self.needs_newline(text) {
            format!("\n{}", text)
        } else {
            text.to_string()
        };

        let len = out.chars().count();
        self.emitted_chars += len;
        self.after_tool = false;
        self.since_tool = self
            .since_tool
            .map(|n| n + len)
            .filter(|n| *n < JOIN_WINDOW_CHARS);
        if !out.is_empty() {
            self.ends_with_newline = out.ends_with('\n');
        }
        out
    }

    /// Characters emitted so far
    pub fn emitted_chars(&self) -> usize {
        self.emitted_chars
    }

    fn needs_newline(&self, text: &str) -> bool {
        if self.emitted_chars == 0 || self.ends_with_newline || text.starts_with('\n') {
            return false;
        }
        if self.after_tool {
            return true;
        }
        matches!(self.since_tool, Some(n) if n < JOIN_WINDOW_CHARS)
            && text.chars().next().is_some_and(char::is_uppercase)
    }
}
