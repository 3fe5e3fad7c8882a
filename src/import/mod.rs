// Bulk import module
// CSV retention time loads and compound list imports

pub mod csv_import;
pub mod list_import;
pub mod trace;

pub use csv_import::{
    import_retention_times, parse_run_date, run_import, ImportError, ImportReport, ImportRequest,
    ImportResult, RowError, RowFailure,
};
pub use list_import::{
    import_compound_list, resolve_compound_reference, run_list_import, ListImportReport,
    Unresolved, UnresolvedEntry,
};
pub use trace::{read_trace_file, ImportEvent, TraceEntry, TraceError, TraceWriter};
