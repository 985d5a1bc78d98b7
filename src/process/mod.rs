//! The two process drivers: batch (pipes, separate stdout/stderr) and
//! interactive (pty, expect/send script). Mode selection itself lives in
//! [`crate::shell`], which dispatches based on whether a Run statement's
//! parsed interaction script is empty.

pub mod batch;
pub mod interactive;
pub mod result;

pub use batch::run_batch;
pub use interactive::run_interactive;
pub use interactive::Step;
pub use result::Mode;
pub use result::ProcessResult;
