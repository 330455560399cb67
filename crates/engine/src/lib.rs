#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`EngineError`)
//! - [`config`]: Engine configuration (`EngineConfig`, builder)
//! - [`collector`]: Manifest collectors (`CollectorRegistry`, npm, pypi, golang)
//! - [`validity`]: Version validity filter
//! - [`aggregator`]: Query planning (`Aggregator` trait, `NoopAggregator`, `GolangAggregator`)
//! - [`cache`]: Namespaced advisory cache (`CacheStore`, `AdvisoryCache`)
//! - [`batch`]: Request batching (`RequestBatch`, `slice_batches`)
//! - [`client`]: Remote advisory API (`AdvisoryClient` trait, `HttpAdvisoryClient`)
//! - [`record`]: Remote response records (`VulnerabilityRecord`)
//! - [`pipeline`]: Diagnostics engines (`Engine` trait, `SecurityEngine`, `DiagnosticsPipeline`)
//! - [`summary`]: Summary notification text
//! - [`cycle`]: Cycle generations and reports (`CycleGuard`, `CycleReport`)
//! - [`analyzer`]: Main orchestrator (`Analyzer`, `AnalyzerBuilder`)
//! - [`tracker`]: Debounced change tracking (`ChangeTracker`, `DocumentEvent`)
//!
//! # Architecture
//!
//! ```text
//! DocumentEvent --> ChangeTracker --(debounce)--> Analyzer::run_cycle
//!                                                       |
//!                     Collector --> validity --> Aggregator (QueryPlan)
//!                                                       |
//!                                  AdvisoryCache hit/miss partition
//!                                     |                       |
//!                               hits: pipeline          misses: RequestBatch x N
//!                                     |                       | (JoinSet + Semaphore)
//!                                     |                 AdvisoryClient::fetch
//!                                     |                       | write-through
//!                                     +-----> DiagnosticsPipeline <-----+
//!                                                       |
//!                                       mpsc --> NotificationEvent
//! ```

pub mod aggregator;
pub mod analyzer;
pub mod batch;
pub mod cache;
pub mod client;
pub mod collector;
pub mod config;
pub mod cycle;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod summary;
pub mod tracker;
pub mod validity;

// --- Public API Re-exports ---

// Analyzer (main orchestrator)
pub use analyzer::{Analyzer, AnalyzerBuilder};

// Change tracking
pub use tracker::{ChangeTracker, CycleRunner, DocumentEvent};

// Configuration
pub use config::{EngineConfig, EngineConfigBuilder};

// Error
pub use error::EngineError;

// Cycle
pub use cycle::{CycleGuard, CycleReport};

// Collectors
pub use collector::{CollectorRegistry, GolangCollector, NpmCollector, PypiCollector};

// Aggregation and batching
pub use aggregator::{Aggregator, GolangAggregator, NoopAggregator, QueryPlan, aggregator_for};
pub use batch::{RequestBatch, slice_batches};

// Cache
pub use cache::{AdvisoryCache, CacheLookup, CacheStore};

// Remote API
pub use client::{AdvisoryClient, HttpAdvisoryClient, RequestContext};
pub use record::{Advisory, VulnerabilityRecord};

// Diagnostics
pub use pipeline::{
    CodeActionIndex, CycleState, DiagnosticsPipeline, Engine, EngineOutput, SecurityEngine,
    TotalCount,
};
pub use summary::build_summary;
