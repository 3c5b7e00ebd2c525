//! Echo-off password prompt
//!
//! Reads one line from the terminal with echo disabled, restoring the
//! previous termios state afterwards. When stdin is not a terminal (pipes,
//! tests) the line is read as-is.

use std::io::{self, BufRead, Write};

use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg};

use crate::error::Result;

/// Prompt on stderr and read a password from stdin without echoing it
pub fn read_password(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;

    let stdin = io::stdin();
    // Not a tty → no echo to suppress
    let saved = tcgetattr(&stdin).ok();

    if let Some(ref saved) = saved {
        let mut quiet = saved.clone();
        quiet.local_flags.remove(LocalFlags::ECHO);
        // Keep the newline visible so the prompt line terminates
        quiet.local_flags.insert(LocalFlags::ECHONL);
        tcsetattr(&stdin, SetArg::TCSANOW, &quiet).map_err(io::Error::from)?;
    }

    let mut line = String::new();
    let read = stdin.lock().read_line(&mut line);

    if let Some(ref saved) = saved {
        let _ = tcsetattr(&stdin, SetArg::TCSANOW, saved);
    }
    read?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
