//! Text clean-up applied before a turn is sent to the speech engine.
//!
//! Neural voices read raw news copy poorly: URLs get spelled character by
//! character, stage directions like `[laughs]` are spoken literally, and
//! industry acronyms come out as made-up words. [`prepare_for_speech`]
//! rewrites those patterns into plain spoken English.

use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+|www\.[^\s<>"{}|\\^`\[\]]+"#).expect("valid URL regex")
});

static BRACKETED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("valid bracket regex"));

static SPACE_BEFORE_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([,.!?;:])").expect("valid punctuation regex"));

static REPEATED_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*,)+").expect("valid comma regex"));

/// Reaction fillers softened or dropped; the turn's emotion carries the tone.
const REACTIONS: &[(&str, &str)] = &[
    ("Hmm...", "Hmm,"),
    ("Oh wow!", "Wow"),
    ("Actually, wait—", "Actually,"),
    ("Oh, that reminds me—", "That reminds me,"),
    ("Ha ha", ""),
    ("ha ha", ""),
    ("haha", ""),
];

/// Whole-word replacements, applied in order.
static PRONUNCIATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bbbl/d\b", "barrels per day"),
        (r"\bbbl\b", "barrels"),
        (r"\bWTI\b", "W T I"),
        (r"\bOPEC\b", "O P E C"),
        (r"\bE&P\b", "E and P"),
        (r"\bM&A\b", "M and A"),
        (r"\bLNG\b", "L N G"),
        (r"\bAPI\b", "A P I"),
        (r"\bEIA\b", "E I A"),
        (r"\bCEO\b", "C E O"),
        (r"\bIPO\b", "I P O"),
        (r"\bvs\.", "versus"),
        (r"\betc\.", "etcetera"),
        (r"\bi\.e\.", "that is"),
        (r"\be\.g\.", "for example"),
        (r"\bQ1\b", "first quarter"),
        (r"\bQ2\b", "second quarter"),
        (r"\bQ3\b", "third quarter"),
        (r"\bQ4\b", "fourth quarter"),
    ]
    .into_iter()
    .map(|(pattern, spoken)| (Regex::new(pattern).expect("valid pronunciation regex"), spoken))
    .collect()
});

/// Rewrite `text` so it reads naturally aloud.
///
/// Returns an empty string when nothing speakable remains.
pub fn prepare_for_speech(text: &str) -> String {
    let mut out = speak_urls(text);

    for (marker, replacement) in REACTIONS {
        out = out.replace(marker, replacement);
    }
    out = BRACKETED_RE.replace_all(&out, "").into_owned();

    for (re, spoken) in PRONUNCIATIONS.iter() {
        out = re.replace_all(&out, *spoken).into_owned();
    }

    out = out.replace("...", ", ").replace(" - ", ", ").replace('—', ", ");

    let collapsed = out.split_whitespace().collect::<Vec<_>>().join(" ");
    let tidy = SPACE_BEFORE_PUNCT_RE.replace_all(&collapsed, "$1");
    let tidy = REPEATED_COMMA_RE.replace_all(&tidy, ",");
    tidy.trim_matches(|c: char| c == ',' || c.is_whitespace()).to_string()
}

/// Replace each URL with its spoken domain, e.g. `rigzone dot com`.
fn speak_urls(text: &str) -> String {
    URL_RE
        .replace_all(text, |caps: &regex::Captures| {
            let raw = &caps[0];
            let url = raw.trim_end_matches(['.', ',', ')', ';', ':', '!', '?']);
            let trailing = &raw[url.len()..];
            format!("{}{}", spoken_domain(url), trailing)
        })
        .into_owned()
}

fn spoken_domain(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);
    let host = host.strip_prefix("www.").unwrap_or(host);
    host.split('.')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" dot ")
}
