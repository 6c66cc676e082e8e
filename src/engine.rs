//! Tiered transformation engine.
//!
//! The engine answers one question per event: given what the headline shows,
//! which canonical value should this feature take? It is split into focused
//! submodules under `src/engine/`:
//!
//! ```text
//! RuleSet ──▶ RuleIndex::new                (index.rs)
//!               one HashMap per tier, keyed by typed keys (keys.rs)
//!                          │
//! event ── RuleQuery ──────┼─ Lexical, Morphological, Syntactic, Default, NoMatch
//!                          │    first tier whose bucket holds a matching rule wins
//!                          v
//!               best candidate in the bucket  (select.rs)
//!                 confidence, then frequency, then rule id
//!                          │
//!                          v
//!     (TransformationResult, StatsDelta)      (transform.rs, stats.rs)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `index.rs`: builds the read-only per-tier hash maps once.
//! - `keys.rs`: fixed-arity key types; deriving a key from a query fails when
//!   the query lacks a field, which skips that tier only.
//! - `select.rs`: picks the winning rule inside one bucket.
//! - `stats.rs`: `EngineStats` counters and the per-event `StatsDelta`.
//! - `transform.rs`: `TransformationEngine`, the tier walk and the NoMatch
//!   identity fallback.
//!
//! The engine itself never mutates after construction. `apply` returns a
//! delta and callers fold it into an `EngineStats` they own, which is what
//! lets the evaluator share one engine across worker threads.
//!
//! ## Debugging
//!
//! Set `REGSHIFT_LOG=regshift=debug` to trace tier fall-through and rule
//! selection.

#[path = "engine/index.rs"]
mod index;
#[path = "engine/keys.rs"]
mod keys;
#[path = "engine/select.rs"]
mod select;
#[path = "engine/stats.rs"]
mod stats;
#[path = "engine/transform.rs"]
mod transform;

#[allow(unused_imports)]
pub use index::RuleIndex;
#[allow(unused_imports)]
pub use stats::{EngineStats, StatsDelta};
#[allow(unused_imports)]
pub use transform::{TransformationEngine, TransformationResult};
