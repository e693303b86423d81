use std::io::{self, Write};
use termimad::{FmtText, MadSkin};

/// Renders model replies as terminal markdown.
pub struct MarkdownPrinter {
    pub skin: MadSkin,
    pub wrap_width: Option<usize>,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self {
            skin: MadSkin::default(),
            wrap_width: None,
        }
    }
}

impl MarkdownPrinter {
    pub fn with_wrap_width(mut self, wrap_width: usize) -> Self {
        self.wrap_width = Some(wrap_width);
        self
    }

    pub fn render(&self, markdown: &str) -> String {
        FmtText::from(&self.skin, markdown, self.wrap_width).to_string()
    }

    pub fn print(&self, out: &mut impl Write, markdown: &str) -> io::Result<()> {
        write!(out, "{}", self.render(markdown))?;
        out.flush()
    }
}
