mod kind;
mod load_report;
mod region;
mod source;

pub use kind::{KindCounts, RegionKind};
pub use load_report::{BatchFailure, LoadReport, LoadStatus, OrphanEntity};
pub use region::{ParentCodes, Region, RegionHierarchy, RegionRecord, StoredRegion};
pub use source::{SourceEntries, SourceError, SourceRecord, SourceScope, SourceSummary};
