//! Props drawn over the captured picture and the compositor that flattens them

pub mod composite;
pub mod props;
pub mod transform;

pub use composite::{CompositeRenderer, ImageCompositor};
pub use props::{Placement, PropList, PropOverlay};
pub use transform::PlacementChange;
