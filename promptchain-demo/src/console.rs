use std::io::{self, Write};
use promptchain::chain::ChainError;
#[cfg(feature = "terminal_printing")]
use promptchain::utils::printing::MarkdownPrinter;

const BANNER_WIDTH: usize = 60;
const RULE_WIDTH: usize = 40;

/// How model replies are written out.
pub enum ResponseStyle {
    Plain,
    #[cfg(feature = "terminal_printing")]
    Markdown(MarkdownPrinter),
}

impl ResponseStyle {
    /// Markdown unless `plain` is requested.
    #[cfg(feature = "terminal_printing")]
    pub fn pick(plain: bool) -> Self {
        if plain {
            ResponseStyle::Plain
        } else {
            ResponseStyle::Markdown(MarkdownPrinter::default())
        }
    }

    #[cfg(not(feature = "terminal_printing"))]
    pub fn pick(_plain: bool) -> Self {
        ResponseStyle::Plain
    }
}

/// Where the demo writes: replies and progress to `out`, chain failures to `err`.
pub struct Console<O: Write, E: Write> {
    out: O,
    err: E,
    style: ResponseStyle,
}

impl<O: Write, E: Write> Console<O, E> {
    pub fn new(out: O, err: E, style: ResponseStyle) -> Self {
        Self { out, err, style }
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)
    }

    /// Writes without a line break, for prompts waiting on input.
    pub fn ask(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{}", text)?;
        self.out.flush()
    }

    pub fn rule(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", "=".repeat(BANNER_WIDTH))
    }

    pub fn banner(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.out)?;
        self.rule()?;
        writeln!(self.out, "{}", title)?;
        self.rule()
    }

    pub fn section(&mut self, header: &str) -> io::Result<()> {
        writeln!(self.out, "\n{}", header)?;
        writeln!(self.out, "{}", "-".repeat(RULE_WIDTH))
    }

    pub fn response(&mut self, text: &str) -> io::Result<()> {
        match &self.style {
            ResponseStyle::Plain => writeln!(self.out, "{}", text),
            #[cfg(feature = "terminal_printing")]
            ResponseStyle::Markdown(printer) => printer.print(&mut self.out, text),
        }
    }

    pub fn failure(&mut self, err: &ChainError) -> io::Result<()> {
        self.out.flush()?;
        writeln!(self.err, "❌ {:?}: {}", err.kind(), err)
    }

    pub fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}

#[cfg(test)]
pub(crate) fn captured() -> Console<Vec<u8>, Vec<u8>> {
    Console::new(Vec::new(), Vec::new(), ResponseStyle::Plain)
}

#[cfg(test)]
pub(crate) fn text_of(console: Console<Vec<u8>, Vec<u8>>) -> (String, String) {
    let (out, err) = console.into_parts();
    (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
}
