use super::*;
use crate::encode::sink::AudioSource;

fn cfg(audio: Option<AudioSource>) -> SinkConfig {
    SinkConfig {
        width: 1080,
        height: 1350,
        fps: Fps::new(30, 1).unwrap(),
        audio,
    }
}

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let src = vec![0u8, 0, 0, 0];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_premul_alpha_255_is_identity() {
    let src = vec![1u8, 2, 3, 255];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn flatten_premul_half_red_over_black() {
    let src = vec![128u8, 0, 0, 128];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [0, 0, 0, 255]).unwrap();
    assert_eq!(dst, vec![128, 0, 0, 255]);
}

#[test]
fn flatten_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 8];
    assert!(flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &[0u8; 4], [0, 0, 0, 255]).is_err());
}

#[test]
fn args_map_source_audio_into_same_output() {
    let sink = FfmpegSink::new(FfmpegSinkOpts::new("out/post.mp4", ContainerProfile::Mp4H264Aac));
    let args = sink
        .command_args(&cfg(Some(AudioSource {
            path: PathBuf::from("in/clip.mov"),
        })))
        .join(" ");
    assert!(args.starts_with("-y -loglevel error -f rawvideo -pix_fmt rgba -s 1080x1350 -r 30/1 -i pipe:0"));
    assert!(args.contains("-i in/clip.mov -map 0:v:0 -map 1:a:0? -shortest"));
    assert!(args.contains("-b:v 5000000"));
    assert!(args.contains("-b:a 128000"));
    assert!(args.ends_with("out/post.mp4"));
    assert!(!args.contains("-an"));
}

#[test]
fn silent_profile_drops_audio_input() {
    let sink = FfmpegSink::new(FfmpegSinkOpts::new("post.webm", ContainerProfile::WebmVp9));
    let args = sink
        .command_args(&cfg(Some(AudioSource {
            path: PathBuf::from("clip.mov"),
        })))
        .join(" ");
    assert!(args.contains("-an"));
    assert!(!args.contains("clip.mov"));
}

#[test]
fn no_audio_source_disables_audio() {
    let sink = FfmpegSink::new(FfmpegSinkOpts::new("post.webm", ContainerProfile::WebmVp9Opus));
    let args = sink.command_args(&cfg(None));
    assert!(args.iter().any(|a| a == "-an"));
    assert!(args.iter().all(|a| a != "-map"));
}

#[test]
fn begin_rejects_odd_dimensions() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("post.mp4", ContainerProfile::Mp4H264Aac));
    let mut c = cfg(None);
    c.width = 1081;
    assert!(matches!(sink.begin(c), Err(BrandframeError::Validation(_))));
}

#[test]
fn push_before_begin_fails() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("post.mp4", ContainerProfile::Mp4H264Aac));
    let frame = FrameRGBA {
        width: 2,
        height: 2,
        data: vec![0; 16],
        premultiplied: true,
    };
    assert!(sink.push_frame(0, &frame).is_err());
    sink.abort();
}
