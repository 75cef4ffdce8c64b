//! Pipeline stages and their entry points.
//!
//! Pure stages: `merge`, `flag`, `select` (plus scoring in `services`).
//! Runners that read and write storage:
//!
//! - `run_collect` / `run_score`: produce scored batches
//! - `run_merge`, `run_flag`, `run_select`: update the master queue
//! - `run_export`: write the selected-only views
//! - `run_pipeline`: all of the above in order

pub mod collect;
pub mod export;
pub mod flag;
pub mod merge;
#[allow(clippy::module_inception)]
pub mod pipeline;
pub mod queue;
pub mod select;
pub mod validate;

pub use collect::{BatchReport, RawInput, load_raw_items, run_collect, run_score};
pub use export::{ExportBundle, build_export, run_export};
pub use flag::{flag_batch, flag_item};
pub use merge::{MergeOutcome, MergeReport, merge_batches, sort_by_score};
pub use pipeline::{PipelineOptions, run_pipeline};
pub use queue::{ProcessOutcome, QueueProcessor, SelectRequest, run_flag, run_merge, run_select};
pub use select::{SelectionOptions, SelectionReport, select_winners};
pub use validate::run_validate;
