mod extension;
mod tagger;
mod validator;

pub use extension::{normalize_extension, strip_extensions, AUDIO_EXTENSIONS};
pub use tagger::{tag_file, TagError, TrackTags};
pub use validator::{is_valid, probe_duration};
