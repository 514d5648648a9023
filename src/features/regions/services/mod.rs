pub mod bulk_loader;
pub mod code_composer;
pub mod exporter;
pub mod hierarchy_assembler;
pub mod region_service;
pub mod source_reader;

pub use bulk_loader::{BulkLoader, LoadOptions};
pub use code_composer::{compose_full_code, derive_parent_codes};
pub use exporter::{import_jsonl, ExportFormat, ExportOptions, ExportReport, ExportRow, Exporter};
pub use hierarchy_assembler::{AssembledRegions, HierarchyAssembler};
pub use region_service::{page_window, RegionListFilter, RegionPage, RegionService};
pub use source_reader::{SourceReader, SourceRecords};
