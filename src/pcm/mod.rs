pub mod reader;
pub mod bytes;
pub mod looping;
pub mod fade;
pub mod cache;
pub mod source;

pub use reader::{read_full, ReadStatus, Reader};
pub use bytes::{read_all, BytesReader};
pub use looping::LoopingReader;
pub use fade::{fade_in, fade_out, FadeIn, FadeOut};
pub use cache::SoundCache;
pub use source::IoReader;
