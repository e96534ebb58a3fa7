//! CLI utilities for facecrm.
//!
//! Configuration, output formatting, the file-backed contact store and
//! offline replay of recorded camera frames and model output.

pub mod config;
pub mod input;
pub mod output;
pub mod paths;
pub mod replay;
pub mod store;

pub use config::{Config, MatchingConfig, RecognitionConfig, StoreConfig, load_config, save_config};
pub use input::{InputError, load_input, parse_input};
pub use output::{Output, OutputFormat};
pub use paths::{Paths, StoreLayout};
pub use replay::{
    PrecomputedExtractor, PrecomputedLoader, RecordedFrame, ReplayFrameSource, load_recording,
    parse_recording,
};
pub use store::JsonFileRepository;
