/// Data layer: canonical types, normalization, and file loading.
///
/// Architecture:
/// ```text
///  typed-in text           .json / .csv / .xlsx
///        │                        │
///        ▼                        ▼
///   ┌───────────┐           ┌──────────┐
///   │ normalize │           │  loader  │  (xlsx → zip + XML)
///   └───────────┘           └──────────┘
///        │                        │
///        └──────────┬─────────────┘
///                   ▼
///           ┌───────────────┐
///           │ CanonicalData │  Records | Labeled
///           └───────────────┘
/// ```

pub mod loader;
pub mod model;
pub mod normalize;
pub mod xlsx;
