//! Generation and storage assets.

/// Stationary battery (zero supply, LCOE only).
pub mod battery;
/// Solar photovoltaic array.
pub mod solar;
pub mod types;
/// Wind turbine group.
pub mod wind;

pub use battery::Battery;
pub use solar::Solar;
pub use types::{Asset, AssetFinancials, AssetKind, AssetModel, Generator, levelized_cost};
pub use wind::Wind;
