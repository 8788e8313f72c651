//! OmniDB: one API over many database engines
//!
//! Re-exports [`omnidb_core`]. Backends are resolved by name through the
//! [`Registry`]; the `sqlite` feature (on by default) registers `sqlite3`.
//!
//! ```no_run
//! use omnidb::{ConnectionConfig, ResultStatus, RowStatus, global_registry};
//!
//! # async fn demo() -> omnidb::DbResult<()> {
//! let mut handle = global_registry()
//!     .connect(&ConnectionConfig::sqlite_in_memory())
//!     .await?;
//! handle.query("SELECT 1; SELECT 2").await?;
//! loop {
//!     match handle.result(None, 25).await? {
//!         ResultStatus::Done => break,
//!         ResultStatus::Rows => {
//!             while handle.row_fetch()? == RowStatus::Row {
//!                 println!("{:?}", handle.field_value(0)?);
//!             }
//!         }
//!         ResultStatus::Timeout | ResultStatus::NoRows => {}
//!     }
//! }
//! handle.result_finish().await?;
//! handle.finish().await
//! # }
//! ```

pub use omnidb_core::*;
