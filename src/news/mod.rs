//! News collection: feeds in, a short list of relevant articles out.
//!
//! The collection pipeline runs in four steps:
//!
//! 1. **Fetching** ([`feeds`]): pull every configured RSS/Atom feed in turn;
//!    a failing feed is logged and skipped
//! 2. **Scoring** ([`scoring`]): weighted keyword density, exclusion list,
//!    recency bonus and cutoff
//! 3. **Selection** ([`selection`]): title dedup, score ordering, per-source
//!    diversity cap, top-N
//! 4. **Market data** ([`market`]): optional WTI/Brent quotes for the show's
//!    market segment
//!
//! | Step | Failure mode |
//! |------|--------------|
//! | Single feed fetch | Skipped, others continue |
//! | Nothing selected | Fatal (`PipelineError::NoArticles`) |
//! | Market data | Episode proceeds without market commentary |

pub mod feeds;
pub mod market;
pub mod scoring;
pub mod selection;
