pub mod batch;
pub mod config;
pub mod job;
pub mod key;
pub mod presets;
pub mod scanner;
pub mod table;
pub mod translate;

pub use batch::{
    append_entries, process_batch, run_batch, BatchError, BatchEvent, BatchOptions, BatchSummary,
    EventSink,
};
pub use config::{ConfigError, LocalizerConfig};
pub use job::{BatchHandle, BatchRequest, BatchRunner, RunnerError};
pub use key::{derive_entry, names_key, parse_manual_input, LocalizationEntry};
pub use presets::{open_table_folder, InstallPreset, PresetResolution};
pub use scanner::{DiscoveredUnit, OdfScanner, ScanConfig, ScanError};
pub use table::{load_existing_keys, LineEnding, TableAppender, TableError, TableRow, DELIMITER};
pub use translate::{GoogleTranslator, Language, TranslationError, TranslationProvider};
