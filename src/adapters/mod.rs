// Adapters - External system implementations

pub mod csv_rows;
pub mod exec_ffmpeg;
pub mod fs_local;
pub mod probe_ffprobe;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use csv_rows::CsvEventSource;
pub use exec_ffmpeg::FFmpegAdapter;
pub use fs_local::FsLocalAdapter;
pub use probe_ffprobe::FFprobeAdapter;
pub use toml_config::TomlConfigAdapter;
pub use tracing_log::TracingLogAdapter;
