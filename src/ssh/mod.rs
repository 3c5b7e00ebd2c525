//! Interactive SSH integration
//!
//! Everything that touches the SSH client lives here:
//! - [`SshLauncher`] - builds and runs the foreground client process
//! - [`read_password`] - echo-off terminal prompt for password sessions

mod launcher;
mod prompt;

pub use launcher::*;
pub use prompt::*;
