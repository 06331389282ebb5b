pub mod frame;
pub mod lame;

pub use frame::{ChannelMode, FrameHeader, Layer, MpegVersion};
pub use lame::{LameInfo, TagKind, TagUpdate, XingFrame};
