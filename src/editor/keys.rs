const ESC: u8 = 0x1b;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Printable(char),
    Backspace,
    Enter,
    Eof,
    Up,
    Down,
    Left,
    Right,
    Tab,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    Csi,
}

/// Turns the raw byte stream into key events. Arrow keys arrive as
/// `ESC [ A..D`, so the decoder holds state across calls.
#[derive(Debug)]
pub struct KeyDecoder {
    state: State,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Ground,
        }
    }

    /// Feeds one byte; returns a key once a complete one has been seen.
    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match self.state {
            State::Ground => match byte {
                ESC => {
                    self.state = State::Escape;
                    None
                }
                b'\n' | b'\r' => Some(Key::Enter),
                0x7f | 0x08 => Some(Key::Backspace),
                0x04 => Some(Key::Eof),
                b'\t' => Some(Key::Tab),
                0x20..=0x7e => Some(Key::Printable(byte as char)),
                _ => Some(Key::Other),
            },
            State::Escape => {
                if byte == b'[' {
                    self.state = State::Csi;
                    None
                } else {
                    self.state = State::Ground;
                    Some(Key::Other)
                }
            }
            State::Csi => {
                // parameter bytes (e.g. the `3` in `ESC [ 3 ~`) keep us here
                if (0x30..=0x3f).contains(&byte) {
                    return None;
                }
                self.state = State::Ground;
                Some(match byte {
                    b'A' => Key::Up,
                    b'B' => Key::Down,
                    b'C' => Key::Right,
                    b'D' => Key::Left,
                    _ => Key::Other,
                })
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = State::Ground;
    }
}
