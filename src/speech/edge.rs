//! Microsoft Edge "read aloud" speech engine.
//!
//! Speaks the same websocket protocol the Edge browser uses: one connection
//! per request, a `speech.config` text frame selecting the output format, an
//! `ssml` text frame carrying the voice and prosody, then binary `Path:audio`
//! frames until a `Path:turn.end` text frame.
//!
//! Binary frames are laid out as a big-endian `u16` header length, the
//! header block, then the raw MP3 payload.

use super::{Prosody, SpeechEngine, VoiceProfile};
use crate::config::TtsConfig;
use crate::error::SynthesisError;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use sha2::{Digest, Sha256};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, client::IntoClientRequest, http::HeaderValue, protocol::Message},
};
use tracing::{debug, instrument};
use uuid::Uuid;

const WSS_URL_BASE: &str =
    "wss://speech.platform.bing.com/consumer/speech/synthesize/readaloud/edge/v1";
const TRUSTED_CLIENT_TOKEN: &str = "6A5AA1D4EAFF4E9FB37E23D68491D6F4";
const SEC_MS_GEC_VERSION: &str = "1-130.0.2849.68";
const ORIGIN: &str = "chrome-extension://jdiccldimpdaibmpdkjnbmckianbfold";
/// Seconds between 1601-01-01 (Windows epoch) and 1970-01-01.
const WIN_EPOCH_OFFSET: i64 = 11_644_473_600;

/// Edge read-aloud client. All request headers come from [`TtsConfig`].
#[derive(Debug, Clone)]
pub struct EdgeTts {
    user_agent: String,
    output_format: String,
}

impl EdgeTts {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            output_format: config.output_format.clone(),
        }
    }

    fn config_frame(&self) -> String {
        format!(
            "X-Timestamp:{}\r\nContent-Type:application/json; charset=utf-8\r\nPath:speech.config\r\n\r\n\
             {{\"context\":{{\"synthesis\":{{\"audio\":{{\"metadataoptions\":{{\"sentenceBoundaryEnabled\":\"false\",\"wordBoundaryEnabled\":\"false\"}},\"outputFormat\":\"{}\"}}}}}}}}",
            timestamp(),
            self.output_format
        )
    }
}

impl SpeechEngine for EdgeTts {
    #[instrument(level = "debug", skip_all, fields(voice = %voice.name, chars = text.len()))]
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        prosody: &Prosody,
    ) -> Result<Vec<u8>, SynthesisError> {
        let connection_id = Uuid::new_v4().simple().to_string();
        let url = format!(
            "{}?TrustedClientToken={}&ConnectionId={}&Sec-MS-GEC={}&Sec-MS-GEC-Version={}",
            WSS_URL_BASE,
            TRUSTED_CLIENT_TOKEN,
            connection_id,
            sec_ms_gec(Utc::now().timestamp()),
            SEC_MS_GEC_VERSION
        );

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(classify_ws_error)?;
        let headers = request.headers_mut();
        headers.insert("Pragma", HeaderValue::from_static("no-cache"));
        headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
        headers.insert("Origin", HeaderValue::from_static(ORIGIN));
        headers.insert("Accept-Language", HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(
            "User-Agent",
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| SynthesisError::Protocol(format!("invalid user agent: {e}")))?,
        );

        let (ws_stream, _) = connect_async(request).await.map_err(classify_ws_error)?;
        let (mut write, mut read) = ws_stream.split();

        write
            .send(Message::Text(self.config_frame().into()))
            .await
            .map_err(classify_ws_error)?;

        let request_id = Uuid::new_v4().simple().to_string();
        let ssml_frame = format!(
            "X-RequestId:{}\r\nContent-Type:application/ssml+xml\r\nX-Timestamp:{}Z\r\nPath:ssml\r\n\r\n{}",
            request_id,
            timestamp(),
            ssml(text, voice, prosody)
        );
        write
            .send(Message::Text(ssml_frame.into()))
            .await
            .map_err(classify_ws_error)?;

        let mut audio = Vec::new();
        while let Some(msg) = read.next().await {
            match msg.map_err(classify_ws_error)? {
                Message::Text(frame) => {
                    if frame.as_str().contains("Path:turn.end") {
                        break;
                    }
                }
                Message::Binary(frame) => {
                    if let Some(payload) = audio_payload(&frame) {
                        audio.extend_from_slice(payload);
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        debug!(bytes = audio.len(), "Received audio");
        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }
        Ok(audio)
    }
}

/// Map websocket failures onto the retry taxonomy.
fn classify_ws_error(err: tungstenite::Error) -> SynthesisError {
    match err {
        tungstenite::Error::Http(response) => {
            let status = response.status();
            if status.as_u16() == 403 || status.as_u16() == 429 {
                SynthesisError::RateLimited(status.to_string())
            } else {
                SynthesisError::Protocol(format!("unexpected HTTP status {status}"))
            }
        }
        tungstenite::Error::Io(e) => SynthesisError::Connection(e.to_string()),
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            SynthesisError::Connection("connection closed".to_string())
        }
        other => {
            let message = other.to_string();
            if message.contains("403") || message.contains("Invalid response status") {
                SynthesisError::RateLimited(message)
            } else if message.to_lowercase().contains("connection") {
                SynthesisError::Connection(message)
            } else {
                SynthesisError::Protocol(message)
            }
        }
    }
}

/// Extract the MP3 payload from a binary frame, if it is an audio frame.
fn audio_payload(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < 2 {
        return None;
    }
    let header_len = u16::from_be_bytes([frame[0], frame[1]]) as usize;
    let body_start = 2 + header_len;
    if header_len == 0 || frame.len() < body_start {
        return None;
    }
    let headers = String::from_utf8_lossy(&frame[2..body_start]);
    if headers.contains("Path:audio") {
        Some(&frame[body_start..])
    } else {
        None
    }
}

/// The `Sec-MS-GEC` token: SHA-256 over the Windows-epoch tick count, rounded
/// down to five minutes, concatenated with the client token.
fn sec_ms_gec(unix_seconds: i64) -> String {
    let ticks = unix_seconds + WIN_EPOCH_OFFSET;
    let ticks = (ticks - ticks.rem_euclid(300)) as u128 * 10_000_000;
    let mut hasher = Sha256::new();
    hasher.update(format!("{ticks}{TRUSTED_CLIENT_TOKEN}"));
    hex::encode(hasher.finalize()).to_uppercase()
}

fn timestamp() -> String {
    Utc::now()
        .format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
        .to_string()
}

fn ssml(text: &str, voice: &VoiceProfile, prosody: &Prosody) -> String {
    let parts: Vec<&str> = voice.name.split('-').collect();
    let lang = if parts.len() >= 3 {
        parts[..2].join("-")
    } else {
        "en-US".to_string()
    };
    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='{}'>\
         <voice name='{}'><prosody pitch='{}' rate='{}' volume='+0%'>{}</prosody></voice></speak>",
        lang,
        voice.name,
        prosody.pitch_attr(),
        prosody.rate_attr(),
        quick_xml::escape::escape(text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_payload_extraction() {
        let headers = b"X-RequestId:abc\r\nContent-Type:audio/mpeg\r\nPath:audio\r\n";
        let mut frame = (headers.len() as u16).to_be_bytes().to_vec();
        frame.extend_from_slice(headers);
        frame.extend_from_slice(&[0xff, 0xfb, 0x90]);
        assert_eq!(audio_payload(&frame), Some(&[0xff, 0xfb, 0x90][..]));
    }

    #[test]
    fn test_non_audio_frames_ignored() {
        let headers = b"Path:turn.start\r\n";
        let mut frame = (headers.len() as u16).to_be_bytes().to_vec();
        frame.extend_from_slice(headers);
        frame.push(1);
        assert_eq!(audio_payload(&frame), None);
        assert_eq!(audio_payload(&[0]), None);
        // Declared header longer than the frame.
        assert_eq!(audio_payload(&[0, 50, 1, 2]), None);
    }

    #[test]
    fn test_sec_ms_gec_is_stable_within_window() {
        let a = sec_ms_gec(1_700_000_100);
        let b = sec_ms_gec(1_700_000_150);
        let c = sec_ms_gec(1_700_000_500);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_digit() || ch.is_ascii_uppercase()));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_ssml_escapes_text_and_sets_prosody() {
        let voice = VoiceProfile::new("en-US-AriaNeural", 2, -2);
        let doc = ssml("Oil & gas <up>", &voice, &Prosody::new(7, 0));
        assert!(doc.contains("xml:lang='en-US'"));
        assert!(doc.contains("<voice name='en-US-AriaNeural'>"));
        assert!(doc.contains("pitch='+0Hz' rate='+7%'"));
        assert!(doc.contains("Oil &amp; gas &lt;up&gt;"));
    }
}
