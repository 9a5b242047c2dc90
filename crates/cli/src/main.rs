mod transforms;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use framestream_core::display::domain::display_backend::DisplayBackend;
use framestream_core::display::infrastructure::headless_display::HeadlessDisplay;
use framestream_core::display::infrastructure::terminal_display::TerminalDisplay;
use framestream_core::shared::constants::{DEFAULT_IMAGE_DIGITS, IMAGE_EXTENSIONS};
use framestream_core::video::infrastructure::ffmpeg_backend::FfmpegBackend;
use framestream_core::video::infrastructure::image_file_codec::ImageFileCodec;
use framestream_core::{FourCc, FrameErrorPolicy, FrameStreamDriver, VideoOutput};

use transforms::TransformKind;

/// Read frames from a video, camera or image folder, transform them and
/// write them back out.
#[derive(Parser)]
#[command(name = "framestream")]
struct Cli {
    /// Input video file.
    #[arg(required_unless_present_any = ["device", "images"], conflicts_with_all = ["device", "images"])]
    input: Option<PathBuf>,

    /// Capture device number instead of a file.
    #[arg(long, conflicts_with = "images")]
    device: Option<u32>,

    /// Directory of images to read in name order instead of a video.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Output video file.
    #[arg(long, conflicts_with = "frames_prefix")]
    output: Option<PathBuf>,

    /// Output codec as a four-character code (default: input codec).
    #[arg(long, requires = "output")]
    codec: Option<String>,

    /// Output frame rate (default: input frame rate).
    #[arg(long, requires = "output")]
    fps: Option<f64>,

    /// Write a grayscale video.
    #[arg(long)]
    gray: bool,

    /// Write each frame as an image named PREFIX + number + extension.
    #[arg(long)]
    frames_prefix: Option<String>,

    /// Image extension for --frames-prefix.
    #[arg(long, default_value = ".bmp")]
    frames_ext: String,

    /// Zero-padded width of the frame number.
    #[arg(long, default_value_t = DEFAULT_IMAGE_DIGITS, allow_negative_numbers = true)]
    digits: i32,

    /// Number of the first written image.
    #[arg(long, default_value = "0")]
    start_index: u64,

    /// Transform applied to every frame.
    #[arg(long, value_enum, default_value = "none")]
    transform: TransformKind,

    /// Stop once this many frames from the start of the input were read.
    #[arg(long)]
    stop_frame: Option<u64>,

    /// Wait this many milliseconds after each frame (a key press cancels).
    #[arg(long, conflicts_with = "realtime")]
    delay_ms: Option<u64>,

    /// Pace playback at the input frame rate.
    #[arg(long)]
    realtime: bool,

    /// Start reading at this frame.
    #[arg(long)]
    seek_frame: Option<u64>,

    /// Preview input frames in the terminal.
    #[arg(long)]
    show_input: bool,

    /// Preview output frames in the terminal.
    #[arg(long)]
    show_output: bool,

    /// Skip frames that cannot be read or written instead of stopping.
    #[arg(long)]
    skip_bad_frames: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let display: Box<dyn DisplayBackend> = if cli.show_input || cli.show_output {
        Box::new(TerminalDisplay::new())
    } else {
        Box::new(HeadlessDisplay::with_cancel_flag(cancel.clone()))
    };
    let mut driver = FrameStreamDriver::new(
        Box::new(FfmpegBackend::new()),
        Box::new(ImageFileCodec::new()),
        display,
    );

    open_input(&mut driver, &cli)?;
    if let Some(frame) = cli.seek_frame {
        driver.seek_frame(frame)?;
    }
    open_output(&mut driver, &cli)?;

    transforms::install(&mut driver, cli.transform);
    driver.set_stop_frame(cli.stop_frame);
    driver.set_delay(frame_delay(&cli, driver.frame_rate()));
    if cli.skip_bad_frames {
        driver.set_frame_error_policy(FrameErrorPolicy::Skip);
    }
    if cli.show_input {
        driver.show_input("Input")?;
    }
    if cli.show_output {
        driver.show_output("Output")?;
    }

    // Raw mode swallows SIGINT while previewing; there the key press cancels.
    let stop = driver.stop_handle();
    ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
        stop.request();
    })?;

    let summary = driver.run();
    driver.hide_displays();
    eprintln!("{summary}");
    if summary.failed() {
        return Err(summary.stop_reason.to_string().into());
    }
    Ok(())
}

fn open_input(driver: &mut FrameStreamDriver, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(id) = cli.device {
        driver.set_input_device(id)?;
    } else if let Some(dir) = &cli.images {
        driver.set_input_images(list_images(dir)?)?;
    } else if let Some(path) = &cli.input {
        driver.set_input_file(path)?;
    }
    if let Some(total) = driver.total_frame_count() {
        log::info!("Input has {total} frames");
    }
    Ok(())
}

fn open_output(driver: &mut FrameStreamDriver, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &cli.output {
        let mut config = VideoOutput::new(path).with_color(!cli.gray);
        if let Some(tag) = &cli.codec {
            config = config.with_codec(parse_codec(tag)?);
        }
        if let Some(fps) = cli.fps {
            config = config.with_fps(fps);
        }
        driver.set_video_output(config)?;
    } else if let Some(prefix) = &cli.frames_prefix {
        driver.set_image_output(prefix.as_str(), &cli.frames_ext, cli.digits, cli.start_index)?;
    }
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(input) = &cli.input {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
    }
    if let Some(dir) = &cli.images {
        if !dir.is_dir() {
            return Err(format!("Image directory not found: {}", dir.display()).into());
        }
    }
    if let Some(fps) = cli.fps {
        if fps.is_nan() || fps <= 0.0 {
            return Err(format!("Frame rate must be positive, got {fps}").into());
        }
    }
    if cli.digits < 0 {
        return Err(format!("Digits must be non-negative, got {}", cli.digits).into());
    }
    Ok(())
}

fn parse_codec(tag: &str) -> Result<FourCc, Box<dyn std::error::Error>> {
    FourCc::from_str_tag(tag)
        .ok_or_else(|| format!("Codec must be one to four printable characters, got '{tag}'").into())
}

/// Explicit delay wins; `--realtime` paces at the input rate when it is known.
fn frame_delay(cli: &Cli, fps: f64) -> Option<Duration> {
    if let Some(ms) = cli.delay_ms {
        return Some(Duration::from_millis(ms));
    }
    if cli.realtime && fps > 0.0 {
        return Some(Duration::from_secs_f64(1.0 / fps));
    }
    if cli.show_input || cli.show_output {
        return Some(Duration::ZERO);
    }
    None
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Image files directly inside `dir`, sorted by file name.
fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    if paths.is_empty() {
        return Err(format!("No images found in {}", dir.display()).into());
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("framestream").chain(args.iter().copied()))
    }

    #[test]
    fn test_list_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.bmp", "c.jpg", "notes.txt", "clip.mp4"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let names: Vec<String> = list_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.bmp", "b.PNG", "c.jpg"]);
    }

    #[test]
    fn test_list_images_empty_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_images(dir.path()).is_err());
    }

    #[test]
    fn test_input_sources_are_exclusive() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["clip.mp4", "--device", "0"]).is_err());
        assert!(parse(&["--device", "0", "--images", "frames"]).is_err());
        assert!(parse(&["--device", "0"]).is_ok());
    }

    #[test]
    fn test_output_kinds_are_exclusive() {
        assert!(parse(&["clip.mp4", "--output", "a.avi", "--frames-prefix", "f"]).is_err());
        assert!(parse(&["clip.mp4", "--codec", "MJPG"]).is_err());
        let cli = parse(&["clip.mp4", "--frames-prefix", "out_"]).unwrap();
        assert_eq!(cli.frames_ext, ".bmp");
        assert_eq!(cli.digits, 3);
        assert_eq!(cli.transform, TransformKind::None);
    }

    #[test]
    fn test_negative_digits_rejected_by_validation() {
        let cli = parse(&["--device", "0", "--frames-prefix", "f", "--digits", "-1"]).unwrap();
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_frame_delay() {
        let cli = parse(&["--device", "0", "--realtime"]).unwrap();
        assert_eq!(frame_delay(&cli, 25.0), Some(Duration::from_millis(40)));
        assert_eq!(frame_delay(&cli, 0.0), None);

        let cli = parse(&["--device", "0", "--delay-ms", "5"]).unwrap();
        assert_eq!(frame_delay(&cli, 25.0), Some(Duration::from_millis(5)));

        let cli = parse(&["--device", "0", "--show-output"]).unwrap();
        assert_eq!(frame_delay(&cli, 25.0), Some(Duration::ZERO));

        let cli = parse(&["--device", "0"]).unwrap();
        assert_eq!(frame_delay(&cli, 25.0), None);
    }

    #[test]
    fn test_parse_codec() {
        assert_eq!(parse_codec("MJPG").unwrap(), FourCc::new(*b"MJPG"));
        assert!(parse_codec("TOOLONG").is_err());
        assert!(parse_codec("").is_err());
    }
}
