pub mod batch;
pub mod decompile;
pub mod extract;
pub mod model;
pub mod probe;
pub mod report;
pub mod tooling;

pub use batch::{FirebaseScanner, ScanOptions, UNSUPPORTED_BUNDLE_NOTICE};
pub use decompile::DecompileOrchestrator;
pub use extract::{credentials_from_entries, Extraction};
pub use model::{ArchiveJob, CredentialBundle, Exposure, JobSummary};
pub use probe::ExposureProber;
pub use report::ReportSink;
pub use tooling::{detect_apktool, BackendBinary};
