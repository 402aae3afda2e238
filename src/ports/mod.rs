pub mod audio;
pub mod config;
pub mod hardware;
pub mod output;
pub mod transcriber;

pub use audio::AudioSource;
pub use config::ConfigStore;
pub use hardware::CapabilitySource;
pub use output::SegmentSink;
pub use transcriber::Transcriber;
