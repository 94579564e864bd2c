//! Step action dispatch.

pub mod cmd;
pub mod edit;
pub mod verify;

pub use cmd::{CommandFailure, CommandOutput, Deadline, execute_cmd, tail_lines};
pub use edit::execute_edit;
pub use verify::execute_verify;
