//! Shared data model for nbproc: notebook documents and the run records that
//! generated procedures emit at execution time.

pub mod notebook;
pub mod run;

pub use notebook::{Cell, CellSource, CellType, NotebookDocument};
pub use run::{ProcedureResult, RunRecord, RunStatus};
