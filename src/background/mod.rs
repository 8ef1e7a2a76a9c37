mod library;
mod resolver;

pub use library::{BackgroundAsset, BackgroundLibrary, PLACEHOLDER_COUNT};
pub use resolver::{cover_crop, fit_cover, BackgroundResolver, CropRect, ResolvedBackground};
