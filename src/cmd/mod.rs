/*!
Subcommands of the `iris` binary. This file only declares modules and
re-exports what `main.rs` needs.

  src/cmd/
    mod.rs          (this file)
    subject.rs      (Subject enum for `list`)
    call.rs         (CallArgs     + execute_call)
    list.rs         (ListArgs     + execute_list)
    describe.rs     (DescribeArgs + execute_describe)
    watch.rs        (WatchArgs    + execute_watch)
    batch.rs        (BatchArgs    + execute_batch)
    shared.rs       (GlobalOpts, Session, error reporting, exit codes)
    format.rs       (box / table / definition-list rendering)

Conventions:
  - Each subcommand module exposes one public `execute_*` function taking
    its args and the global flags, returning `anyhow::Result<()>`.
  - A failing command prints its own error and returns `shared::Reported`,
    so `main` only picks the exit code.
*/

pub mod batch;
pub mod call;
pub mod describe;
pub mod format;
pub mod list;
pub mod shared;
pub mod subject;
pub mod watch;

pub use batch::{BatchArgs, execute_batch};
pub use call::{CallArgs, execute_call};
pub use describe::{DescribeArgs, execute_describe};
pub use list::{ListArgs, execute_list};
pub use shared::GlobalOpts;
pub use watch::{WatchArgs, execute_watch};
