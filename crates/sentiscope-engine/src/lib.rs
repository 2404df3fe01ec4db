//! Comment sentiment aggregation engine for sentiscope
//!
//! Resolves a categorical sentiment for every comment on a post by
//! orchestrating external inference calls, fuses the text and image signals
//! of each comment, and aggregates the labels into a distribution.
//!
//! # Pipeline
//!
//! ```text
//! comments ─► BatchScheduler ─► per comment (concurrently within a batch):
//!               text  ─► LanguageStage ─► TextResolver ─┐
//!               image ─► ImageResolver ─────────────────┴─► fuse ─► Aggregator
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sentiscope_core::{Comment, EngineConfig};
//! use sentiscope_engine::SentimentEngine;
//!
//! # async fn example() -> sentiscope_core::Result<()> {
//! let config = EngineConfig::default().with_api_token("hf_...");
//! let engine = SentimentEngine::new(&config)?;
//! let report = engine
//!     .compute_distribution(&[Comment::text("I love it").with_image("https://img/1.png")])
//!     .await?;
//! println!("{:?}", report.distribution.percentages());
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod client;
pub mod engine;
pub mod fusion;
pub mod image;
pub mod language;
pub mod pipeline;
pub mod response;
pub mod scheduler;
pub mod text;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::Aggregator;
pub use client::HttpInferenceClient;
pub use engine::SentimentEngine;
pub use fusion::fuse;
pub use image::ImageResolver;
pub use language::LanguageStage;
pub use pipeline::CommentPipeline;
pub use scheduler::{BatchScheduler, ScheduleOutcome};
pub use text::TextResolver;
