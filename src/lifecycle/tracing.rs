//! # Observability & Tracing
//!
//! The cache logs through the `tracing` crate with structured fields rather than
//! formatted strings, so output can be filtered per entity type or address.
//!
//! ## What Gets Traced
//!
//! - **Store Lifecycle**: registration, creation of anonymous stores, resets
//! - **Cache Operations**: Fetch (`debug`), Update/Destroy/Invalidate (`info`), rejected writes (`warn`)
//! - **Resolution**: every resolved descriptor at `debug`, non-fatal invalid paths at `warn`
//! - **Adapter Sync**: one span per [`Resource::sync`](crate::clients::Resource::sync) call
//!
//! ## Usage Examples
//!
//! ```bash
//! # Writes and invalidations only
//! RUST_LOG=info cargo test
//!
//! # Every fetch and resolution
//! RUST_LOG=debug cargo test
//!
//! # Only the store layer
//! RUST_LOG=resource_cache::store=debug cargo test
//! ```
//!
//! **With `RUST_LOG=debug`**:
//!
//! ```text
//! DEBUG Resolved action=get classify=item path="/users/1" valid=true
//! DEBUG Fetch entity_type=user target="user#1" status=stale
//! INFO  Updated entity_type=user target="user#1" fragments=1 queries=1
//! ```
//!
//! Fields are named consistently across modules (`entity_type`, `target`, `path`) so a
//! single filter follows one address through resolution, fetch and update.

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
