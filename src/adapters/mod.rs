// Adapters layer: concrete implementations behind the domain types (CSV roster, SVG
// templates, photo directory, barcode, local output directory).

pub mod barcode;
pub mod photos;
pub mod renderer;
pub mod roster;
pub mod storage;
pub mod template;
