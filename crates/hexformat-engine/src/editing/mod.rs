/*!
 * # Editing Core Module
 *
 * All mutation of the segment forest and the format catalog goes through a
 * [`Document`].
 *
 * ## Architecture Overview
 *
 * ### 1. One aggregate per file
 * - The forest, the catalog, the auto-name counter and the event outbox live
 *   together in a `Document`; there is no process-wide state
 * - Independent documents (and tests) never see each other's structs
 *
 * ### 2. Command-Based Editing
 * - Every edit is a **Command** (`Cmd` enum) with a typed method behind it
 * - Preconditions are checked before the first write, so a rejected command
 *   leaves the document exactly as it was
 * - `Document::apply` turns rejections into `ShowWarningMessage` events
 *
 * ### 3. Struct propagation
 * - User structs list every segment instantiating them
 * - An edit inside one instance is replayed onto every other instance by
 *   re-cloning the edited subtree (see `propagate`)
 *
 * ## Module Structure
 *
 * - **`document`**: `Document`, naming options, event outbox, commit
 * - **`commands`**: `Cmd` enum and dispatch
 * - **`segments`**: split, child partition, merge, rename, display format, clear
 * - **`chunking`**: split / array / separate by format
 * - **`structs`**: define, deferred naming, instantiate, apply by label
 * - **`propagate`**: instance synchronisation
 * - **`patch`**: edit result metadata
 *
 * ## Usage Pattern
 *
 * ```rust
 * use hexformat_engine::editing::*;
 * use hexformat_engine::range::ByteRange;
 *
 * let mut doc = Document::new(32);
 * let root = doc.tree().roots()[0];
 *
 * // carve out an 8 byte header and give it two fields
 * let header = doc.split(root, ByteRange::new(0, 7).unwrap()).unwrap().new_selection.unwrap();
 * doc.create_child(header, ByteRange::new(0, 3).unwrap()).unwrap();
 * doc.define_struct(header, "Header").unwrap();
 *
 * // stamp it onto the next 8 bytes
 * let rest = doc.tree().roots()[1];
 * let second = doc.split(rest, ByteRange::new(8, 15).unwrap()).unwrap().new_selection.unwrap();
 * doc.apply_struct("Header", second).unwrap();
 * assert_eq!(doc.catalog().user("Header").unwrap().locations().len(), 2);
 * ```
 */

mod chunking;
pub mod commands;
pub mod document;
pub mod error;
pub mod patch;
mod propagate;
mod segments;
pub mod structs;

pub use commands::Cmd;
pub use document::{DEFAULT_NAME_PREFIX, DEFAULT_ROOT_NAME, Document, DocumentOptions};
pub use error::EditError;
pub use patch::Patch;
pub use structs::StructNameRequest;
