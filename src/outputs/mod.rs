//! Everything written to the output directory after the audio.
//!
//! # Submodules
//!
//! - [`transcript`]: JSON sidecar next to each episode (script, articles, duration)
//! - [`feed`]: RSS 2.0 + iTunes podcast feed regenerated from the episode directory
//! - [`page`]: static landing page that renders the feed client-side
//!
//! # Output Structure
//!
//! ```text
//! docs/
//! ├── feed.xml
//! ├── index.html
//! └── episodes/
//!     ├── oil_news_20261016.mp3
//!     ├── oil_news_20261016.json
//!     ├── oil_news_20261017.mp3
//!     └── oil_news_20261017.json
//! ```

pub mod feed;
pub mod page;
pub mod transcript;
