pub mod composer;
pub mod config;
pub mod error;
pub mod imports;
pub mod line_filter;
pub mod pipeline;
pub mod registration;
pub mod report;
pub mod sanitizer;

pub use composer::{GeneratedScript, ProcedureComposer};
pub use config::{ConfigLoader, ConfigValidator, ConverterConfig};
pub use error::{CleanupWarning, PipelineError, Stage, StageError};
pub use imports::{ImportClassifier, ImportPartition, ImportStatement, SafetyFilter};
pub use line_filter::{LineFilter, LineTag, SourceLine};
pub use pipeline::{Conversion, PipelineDriver};
pub use registration::{RegistrationEntry, RegistrationRenderer};
pub use report::{BatchReport, ConversionOutcome, OutcomeStatus, OutputFormat};
pub use sanitizer::DocumentSanitizer;
