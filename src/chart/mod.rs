/// Chart layer: dispatch canonical data to a backend-neutral `Figure`, then
/// draw it either live (egui, in the binary) or to a file (plotters).

pub mod dispatch;
pub mod export;
pub mod figure;

pub use dispatch::render;
pub use export::export;
pub use figure::{ChartKind, ChartLabels, Figure};
