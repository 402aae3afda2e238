pub mod config_store;
pub mod hardware_detector;
pub mod json_lines_sink;
pub mod reader_source;
pub mod remote_api;
pub mod stub_backend;
pub mod transcript_parser;
pub mod wav;
pub mod whisper_cpp;
pub mod whisper_server;

#[cfg(test)]
pub(crate) mod test_http;

pub use config_store::TomlConfigStore;
pub use hardware_detector::NvidiaSmiProbe;
pub use json_lines_sink::JsonLinesSink;
pub use reader_source::ReaderSource;
pub use remote_api::RemoteApiBackend;
pub use stub_backend::StubBackend;
pub use whisper_cpp::WhisperCliBackend;
pub use whisper_server::WhisperServerBackend;
