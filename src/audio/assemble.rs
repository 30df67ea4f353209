//! Lays decoded clips end to end with conversational pauses.

use super::{Pcm, samples_for_ms};
use crate::config::AudioConfig;
use crate::models::Speaker;

/// Concatenate `clips` in order.
///
/// A gap of `speaker_change_gap_ms` goes between clips from different
/// speakers and `same_speaker_gap_ms` between clips from the same one. The
/// result is framed by `intro_padding_ms` and `outro_padding_ms` of silence.
pub fn assemble(clips: &[(Speaker, Pcm)], layout: &AudioConfig, sample_rate: u32) -> Pcm {
    let speech_samples: usize = clips.iter().map(|(_, c)| c.len()).sum();
    let gap_samples = clips.len().saturating_sub(1)
        * samples_for_ms(layout.speaker_change_gap_ms.max(layout.same_speaker_gap_ms), sample_rate);
    let mut out = Pcm::new(
        Vec::with_capacity(
            speech_samples
                + gap_samples
                + samples_for_ms(layout.intro_padding_ms + layout.outro_padding_ms, sample_rate),
        ),
        sample_rate,
    );

    out.append(&Pcm::silence(layout.intro_padding_ms, sample_rate));

    let mut previous: Option<Speaker> = None;
    for (speaker, clip) in clips {
        if let Some(prev) = previous {
            let gap_ms = if prev == *speaker {
                layout.same_speaker_gap_ms
            } else {
                layout.speaker_change_gap_ms
            };
            out.append(&Pcm::silence(gap_ms, sample_rate));
        }
        out.append(clip);
        previous = Some(*speaker);
    }

    out.append(&Pcm::silence(layout.outro_padding_ms, sample_rate));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 1_000;

    fn clip(len: usize) -> Pcm {
        Pcm::new(vec![0.5; len], RATE)
    }

    #[test]
    fn test_gaps_follow_speaker_changes() {
        let layout = AudioConfig::default();
        let clips = vec![
            (Speaker::Host1, clip(10)),
            (Speaker::Host2, clip(20)),
            (Speaker::Host2, clip(30)),
        ];
        let out = assemble(&clips, &layout, RATE);

        // 1000 intro + 10 + 300 + 20 + 100 + 30 + 1500 outro, at 1 sample/ms
        assert_eq!(out.len(), 1000 + 10 + 300 + 20 + 100 + 30 + 1500);
        assert_eq!(out.samples[999], 0.0);
        assert_eq!(out.samples[1000], 0.5);
        assert_eq!(out.samples[1010], 0.0);
        assert_eq!(out.samples[1310], 0.5);
        assert_eq!(out.samples[1330], 0.0);
        assert_eq!(out.samples[1430], 0.5);
    }

    #[test]
    fn test_single_clip_only_padded() {
        let out = assemble(&[(Speaker::Host1, clip(5))], &AudioConfig::default(), RATE);
        assert_eq!(out.len(), 1000 + 5 + 1500);
        assert_eq!(out.sample_rate, RATE);
    }
}
