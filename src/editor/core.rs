use crate::history::History;
use crossterm::{
    cursor, queue,
    style::Print,
    terminal::{self, ClearType},
};
use std::io::{self, Write};

use super::keys::Key;

/// What the shell should do after a key has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Pending,
    Submit(String),
    Exit,
}

/// Owns the line being typed. All rendering goes through the writer handed
/// to each call so the editor can be driven against an in-memory buffer.
pub struct LineEditor {
    buffer: String,
}

impl LineEditor {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn handle<W: Write>(
        &mut self,
        key: Key,
        history: &mut History,
        out: &mut W,
    ) -> io::Result<Edit> {
        match key {
            Key::Printable(c) => {
                self.buffer.push(c);
                history.update_current(&self.buffer);
                queue!(out, Print(c))?;
            }

            Key::Backspace => {
                if self.buffer.pop().is_some() {
                    history.update_current(&self.buffer);
                    queue!(
                        out,
                        cursor::MoveLeft(1),
                        terminal::Clear(ClearType::UntilNewLine)
                    )?;
                }
            }

            // Up arrow - previous history
            Key::Up => {
                if let Some(entry) = history.previous() {
                    let entry = entry.to_string();
                    self.replace(entry, out)?;
                }
            }

            // Down arrow - next history, ending at the live slot
            Key::Down => {
                if let Some(entry) = history.next() {
                    let entry = entry.to_string();
                    self.replace(entry, out)?;
                }
            }

            Key::Enter => {
                queue!(out, Print("\n"))?;
                out.flush()?;
                let line = std::mem::take(&mut self.buffer);
                history.submit(&line);
                return Ok(Edit::Submit(line));
            }

            Key::Eof => {
                queue!(out, Print("\n"))?;
                out.flush()?;
                return Ok(Edit::Exit);
            }

            // cursor movement and completion are not supported
            Key::Left | Key::Right | Key::Tab | Key::Other => {}
        }

        out.flush()?;
        Ok(Edit::Pending)
    }

    /// Throws away the in-progress line, including edits to recalled entries.
    pub fn discard(&mut self, history: &mut History) {
        self.buffer.clear();
        history.discard_edits();
    }

    /// Reprints prompt and buffer on a fresh line.
    pub fn redraw<W: Write>(&self, prompt: &str, out: &mut W) -> io::Result<()> {
        queue!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print(prompt),
            Print(&self.buffer)
        )?;
        out.flush()
    }

    /// Erases the rendered buffer (leaving the prompt) and shows `entry`.
    fn replace<W: Write>(&mut self, entry: String, out: &mut W) -> io::Result<()> {
        let width = self.buffer.chars().count();
        if width > 0 {
            queue!(out, cursor::MoveLeft(width as u16))?;
        }
        queue!(out, terminal::Clear(ClearType::UntilNewLine), Print(&entry))?;
        self.buffer = entry;
        Ok(())
    }
}
