//! The two media operations the pipeline performs.

use std::path::Path;

use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Sample rate expected by the speech recognizer.
const AUDIO_SAMPLE_RATE: u32 = 16_000;

/// Build the 360p transcode command.
///
/// `scale=-1:360` fixes the height and lets FFmpeg pick a width that
/// preserves the aspect ratio.
pub fn transcode_command(input: impl AsRef<Path>, output: impl AsRef<Path>) -> FfmpegCommand {
    FfmpegCommand::new(input, output).video_filter("scale=-1:360")
}

/// Build the audio extraction command: mono 16 kHz FLAC, video dropped.
pub fn audio_extract_command(input: impl AsRef<Path>, output: impl AsRef<Path>) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .no_video()
        .audio_codec("flac")
        .sample_rate(AUDIO_SAMPLE_RATE)
        .channels(1)
}

/// Transcode a raw video to 360p.
pub async fn transcode_to_360p(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();
    info!("Transcoding {} to 360p", input.display());

    let cmd = transcode_command(input, output);
    FfmpegRunner::new()
        .run_with_progress(&cmd, |p| {
            if !p.is_complete {
                debug!(out_time_ms = p.out_time_ms, speed = p.speed, "Transcode progress");
            }
        })
        .await?;

    info!("Transcoded to {}", output.display());
    Ok(())
}

/// Extract speech-recognizer-ready audio from a video file.
pub async fn extract_audio(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();
    info!("Extracting audio from {}", input.display());

    let cmd = audio_extract_command(input, output);
    FfmpegRunner::new().run(&cmd).await?;

    info!("Extracted audio to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_command_scales_to_360() {
        let args = transcode_command("raw/v1.mp4", "processed/processed-v1.mp4").build_args();
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "scale=-1:360");
    }

    #[test]
    fn test_audio_command_is_recognizer_ready() {
        let args = audio_extract_command("raw/v1.mp4", "audio/v1.flac").build_args();
        assert!(args.contains(&"-vn".to_string()));
        assert!(args.contains(&"flac".to_string()));
        assert!(args.contains(&"16000".to_string()));
        let ac = args.iter().position(|a| a == "-ac").unwrap();
        assert_eq!(args[ac + 1], "1");
        assert_eq!(args.last().unwrap(), "audio/v1.flac");
    }
}
