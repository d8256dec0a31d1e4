//! Image handling: content sniffing and emoji normalization.

pub mod normalize;

pub use normalize::{EMOJI_SIZE, NormalizedImage, SourceFormat, normalize, sniff_format};
