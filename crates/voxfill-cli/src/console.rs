//! Line input from the terminal, shared by the confirmation, the mapping
//! prompts and the pause/cancel controller.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines, Stdin};
use tokio::runtime::Handle;

use crate::prompt::LineSource;

/// One buffered reader over the session's input.
///
/// Once the input ends or fails the console stays closed and every further
/// read returns `None`.
pub struct Console<R> {
    lines: Lines<BufReader<R>>,
    open: bool,
}

impl Console<Stdin> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

impl<R: AsyncRead + Unpin> Console<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Cancel safe, so it can sit in a `select!` next to the batch events.
    pub async fn next_line(&mut self) -> Option<String> {
        if !self.open {
            return None;
        }
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(line),
            Ok(None) => {
                self.open = false;
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "Input closed");
                self.open = false;
                None
            }
        }
    }
}

/// Blocking reads for the synchronous prompts. Needs the multi-threaded
/// runtime.
impl<R: AsyncRead + Unpin> LineSource for Console<R> {
    fn read_line(&mut self) -> Option<String> {
        tokio::task::block_in_place(|| Handle::current().block_on(self.next_line()))
    }
}
