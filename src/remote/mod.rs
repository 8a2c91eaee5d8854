//! Remote spreadsheet synchronization.
//!
//! The remote sheet is the shared source of truth for translated values.
//! `rows` maps entries onto the sheet's column layout, `changeset` diffs
//! local desired state against a remote snapshot, `sheet` is the HTTP
//! transport seam, and `sync` applies changesets incrementally under
//! optimistic concurrency control.

pub mod changeset;
pub mod rows;
pub mod sheet;
pub mod sync;

pub use changeset::{ChangeSet, calculate_change_set, calculate_data_version};
pub use rows::{Row, SheetLayout};
pub use sheet::{HttpSheetClient, SheetClient};
pub use sync::{RemoteSyncEngine, SyncOptions};
