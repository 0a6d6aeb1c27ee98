//! Chart-making core: normalize loosely structured input into canonical data,
//! dispatch it to a chart description, export that description as an image
//! and ask a chat-completion endpoint to summarize the data.
//!
//! ```text
//!  shorthand / JSON text      .json / .csv / .xlsx
//!            │                        │
//!            ▼                        ▼
//!   ┌──────────────┐          ┌──────────┐
//!   │  normalize   │          │  loader  │
//!   └──────────────┘          └──────────┘
//!            └──────────┬─────────────┘
//!                       ▼
//!               CanonicalData  ──► summary (JSON prompt)
//!                       │
//!                       ▼
//!               ┌──────────────┐
//!               │   dispatch   │  → Figure → export (svg/png/jpg/pdf)
//!               └──────────────┘
//! ```

pub mod chart;
pub mod color;
pub mod data;
pub mod error;
pub mod state;
pub mod summary;

pub use error::{ChartError, Result};
