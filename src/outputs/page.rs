//! Static `index.html` landing page.
//!
//! The page carries no episode data itself; a small script fetches
//! `feed.xml` at view time and renders the ten newest items with an inline
//! audio player each.

use crate::config::ShowInfo;
use crate::error::PipelineError;
use quick_xml::escape::escape;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Episodes shown on the page.
pub const PAGE_EPISODES: usize = 10;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="{{LANGUAGE}}">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{TITLE}}</title>
  <link rel="alternate" type="application/rss+xml" title="{{TITLE}}" href="feed.xml">
  <style>
    body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; max-width: 760px; margin: 0 auto; padding: 2rem 1rem; color: #222; }
    header { display: flex; gap: 1.5rem; align-items: center; margin-bottom: 2rem; }
    header img { width: 140px; height: 140px; border-radius: 8px; object-fit: cover; }
    .episode { border-top: 1px solid #ddd; padding: 1rem 0; }
    .episode h2 { font-size: 1.1rem; margin: 0 0 .25rem; }
    .meta { color: #666; font-size: .9rem; margin-bottom: .5rem; }
    audio { width: 100%; }
  </style>
</head>
<body>
  <header>
    <img src="{{IMAGE}}" alt="{{TITLE}} cover art">
    <div>
      <h1>{{TITLE}}</h1>
      <p>{{DESCRIPTION}}</p>
      <p><a href="feed.xml">Subscribe via RSS</a></p>
    </div>
  </header>
  <main id="episodes"><p>Loading episodes…</p></main>
  <script>
    fetch("feed.xml")
      .then(function (r) { return r.text(); })
      .then(function (text) {
        var doc = new DOMParser().parseFromString(text, "application/xml");
        var items = Array.prototype.slice.call(doc.querySelectorAll("item"), 0, {{LIMIT}});
        var main = document.getElementById("episodes");
        main.innerHTML = "";
        if (items.length === 0) {
          main.innerHTML = "<p>No episodes yet.</p>";
          return;
        }
        items.forEach(function (item) {
          var field = function (name) {
            var el = item.getElementsByTagName(name)[0];
            return el ? el.textContent : "";
          };
          var enclosure = item.querySelector("enclosure");
          var section = document.createElement("section");
          section.className = "episode";
          var title = document.createElement("h2");
          title.textContent = field("title");
          var meta = document.createElement("div");
          meta.className = "meta";
          meta.textContent = [new Date(field("pubDate")).toDateString(), field("itunes:duration")]
            .filter(Boolean).join(" · ");
          var desc = document.createElement("p");
          desc.textContent = field("description");
          section.appendChild(title);
          section.appendChild(meta);
          section.appendChild(desc);
          if (enclosure) {
            var audio = document.createElement("audio");
            audio.controls = true;
            audio.preload = "none";
            audio.src = enclosure.getAttribute("url");
            section.appendChild(audio);
          }
          main.appendChild(section);
        });
      })
      .catch(function () {
        document.getElementById("episodes").innerHTML = "<p>Could not load the feed.</p>";
      });
  </script>
</body>
</html>
"#;

pub fn render_index(show: &ShowInfo) -> String {
    TEMPLATE
        .replace("{{LANGUAGE}}", &escape(show.language.as_str()))
        .replace("{{TITLE}}", &escape(show.title.as_str()))
        .replace("{{DESCRIPTION}}", &escape(show.description.as_str()))
        .replace("{{IMAGE}}", &escape(show.image_url().as_str()))
        .replace("{{LIMIT}}", &PAGE_EPISODES.to_string())
}

/// Write `<output_dir>/index.html`.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_index(output_dir: &Path, show: &ShowInfo) -> Result<PathBuf, PipelineError> {
    let path = output_dir.join("index.html");
    fs::create_dir_all(output_dir).await?;
    fs::write(&path, render_index(show)).await?;
    info!(path = %path.display(), "Wrote landing page");
    Ok(path)
}
