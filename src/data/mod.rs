//! Data layer: the generalized filter → aggregate → present pipeline.
//!
//! Architecture:
//! ```text
//!  .csv / ::-separated / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │   load    │  sources → join → derived columns → clean rules
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Dataset   │  immutable base (+ pre-join sources), memoized per dashboard
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ pipeline  │  filter → aggregate + summarize → ChartSpecs + KPIs
//!   └──────────┘
//! ```
//!
//! Every sidebar interaction re-runs `pipeline::run` over the memoized
//! dataset; nothing downstream mutates it.

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod load;
pub mod metrics;
pub mod model;
pub mod pipeline;
