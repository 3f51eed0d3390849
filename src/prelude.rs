pub use crate::config::StoreConfig;
pub use crate::data_structs::chrom::{
    canonical_chrom,
    compare_chrom,
};
pub use crate::data_structs::typedef::PosType;
pub use crate::data_structs::{
    IntervalSet,
    Region,
    Strand,
};
pub use crate::error::{
    Result,
    StoreError,
};
pub use crate::store::{
    AutoPrompt,
    Collaborators,
    Dataset,
    GenomeCatalog,
    ImportOutcome,
    Layer,
    LoadReport,
    LoadWorker,
    MemoryViewer,
    Prompt,
    Registry,
    SharedRegistry,
    StaticGenomeCatalog,
    StoreLock,
    Version,
    Viewer,
};
