//! Concrete task implementations for SakuraTree (Layer 3).
//!
//! Every blossom here implements the four-phase contract from
//! `sakura_tree`: input parsing in `init`, an idempotence probe in
//! `pre_check` (the desired state already holding turns the run into a
//! `SKIPPED`), the side effect in `run`, and verification in `post_check`.
//!
//! [`default_registry`] wires them all up:
//!
//! | group / type | effect |
//! |---|---|
//! | `special/cmd` | run a shell command, capture its output |
//! | `text/read` | read a text file into the output |
//! | `text/write` | write a text file (skips on identical content) |
//! | `text/append` | append to a text file |
//! | `path/copy` | copy a regular file (skips on identical content) |
//! | `path/rename` | rename a file or directory (skips when done) |
//! | `path/delete` | delete a file or directory (skips when absent) |
//! | `template/create` | render a template file against the namespace |
//! | `assert/equal` | fail unless a resolved value matches |

/// Assertion blossom.
pub mod assert;

/// Shell command blossom.
pub mod cmd;

/// Path operation blossoms.
pub mod path;

/// Template rendering blossom.
pub mod template;

/// Text file blossoms.
pub mod text;

pub use assert::AssertEqualBlossom;
pub use cmd::CmdBlossom;
pub use path::{PathCopyBlossom, PathDeleteBlossom, PathRenameBlossom};
pub use template::TemplateCreateBlossom;
pub use text::{TextAppendBlossom, TextReadBlossom, TextWriteBlossom};

use sakura_tree::registry::BlossomRegistry;

/// Registry with every blossom of this crate registered.
#[must_use]
pub fn default_registry() -> BlossomRegistry {
    let mut registry = BlossomRegistry::new();
    registry.register("special", "cmd", || Box::new(CmdBlossom::new()));
    registry.register("text", "read", || Box::new(TextReadBlossom::new()));
    registry.register("text", "write", || Box::new(TextWriteBlossom::new()));
    registry.register("text", "append", || Box::new(TextAppendBlossom::new()));
    registry.register("path", "copy", || Box::new(PathCopyBlossom::new()));
    registry.register("path", "rename", || Box::new(PathRenameBlossom::new()));
    registry.register("path", "delete", || Box::new(PathDeleteBlossom::new()));
    registry.register("template", "create", || {
        Box::new(TemplateCreateBlossom::new())
    });
    registry.register("assert", "equal", || Box::new(AssertEqualBlossom::new()));
    registry
}
