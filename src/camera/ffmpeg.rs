use std::{
    ffi::OsString,
    io::{BufRead, BufReader, Read, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
    thread::JoinHandle,
};

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};

/// Encodes raw RGBA frames to an MP4 file through an `ffmpeg` child process.
pub struct FfmpegRecorder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_tail: Option<JoinHandle<String>>,
    output_path: PathBuf,
    frame_len: usize,
    frames: u64,
}

impl FfmpegRecorder {
    pub fn spawn(
        output_path: &Path,
        width: u32,
        height: u32,
        frame_rate: u32,
        audio: bool,
    ) -> Result<Self> {
        let ffmpeg = find_ffmpeg().ok_or_else(|| anyhow!("ffmpeg was not found on PATH"))?;
        let args = encoder_args(output_path, width, height, frame_rate, audio);
        debug!("{} {:?}", ffmpeg.display(), args);

        let mut child = Command::new(&ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start {}", ffmpeg.display()))?;
        let stdin = child.stdin.take();
        // keep the pipe drained so ffmpeg never blocks on its own diagnostics
        let stderr_tail = child
            .stderr
            .take()
            .map(|stderr| std::thread::spawn(move || last_line(stderr)));
        info!("ffmpeg recording started (pid {})", child.id());

        Ok(Self {
            child,
            stdin,
            stderr_tail,
            output_path: output_path.to_path_buf(),
            frame_len: (width * height * 4) as usize,
            frames: 0,
        })
    }

    pub fn write_frame(&mut self, rgba: &[u8]) -> Result<()> {
        if rgba.len() != self.frame_len {
            return Err(anyhow!(
                "frame size changed during recording ({} != {} bytes)",
                rgba.len(),
                self.frame_len
            ));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow!("encoder input already closed"))?;
        stdin.write_all(rgba).context("ffmpeg stopped accepting frames")?;
        self.frames += 1;
        Ok(())
    }

    /// Closes the input and waits for ffmpeg to flush the file.
    pub fn finish(mut self) -> Result<PathBuf> {
        drop(self.stdin.take());
        let status = self.child.wait()?;
        let tail = self
            .stderr_tail
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(anyhow!("ffmpeg exited with {status}: {tail}"));
        }
        if self.frames == 0 {
            return Err(anyhow!("no frames were recorded"));
        }
        info!("ffmpeg wrote {} frames to {}", self.frames, self.output_path.display());
        Ok(self.output_path.clone())
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            warn!("ffmpeg recorder dropped while recording, killing encoder");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn encoder_args(
    output_path: &Path,
    width: u32,
    height: u32,
    frame_rate: u32,
    audio: bool,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "-s".into(),
        format!("{width}x{height}").into(),
        "-r".into(),
        frame_rate.to_string().into(),
        "-i".into(),
        "-".into(),
    ];
    if audio {
        if cfg!(target_os = "linux") {
            args.extend(["-f", "pulse", "-i", "default"].map(OsString::from));
        } else {
            warn!("audio capture is only wired up for PulseAudio, recording video only");
        }
    }
    args.extend(
        ["-c:v", "libx264", "-preset", "veryfast", "-pix_fmt", "yuv420p"].map(OsString::from),
    );
    if audio && cfg!(target_os = "linux") {
        args.extend(["-c:a", "aac", "-shortest"].map(OsString::from));
    }
    // the single recording file is replaced every time
    args.push("-y".into());
    args.push(output_path.as_os_str().to_os_string());
    args
}

/// Reads `reader` to the end, returning its last non-blank line.
fn last_line(reader: impl Read) -> String {
    let mut last = String::new();
    for line in BufReader::new(reader).lines() {
        let Ok(line) = line else {
            break;
        };
        if !line.trim().is_empty() {
            last = line;
        }
    }
    last
}

fn find_ffmpeg() -> Option<PathBuf> {
    let name = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn video_only_arguments() {
        let args = strings(&encoder_args(Path::new("/tmp/out.mp4"), 640, 480, 30, false));
        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pix_fmt rgba -s 640x480 -r 30 -i -"));
        assert!(joined.contains("-c:v libx264"));
        assert!(!joined.contains("pulse"));
        assert_eq!(&args[args.len() - 2..], &["-y", "/tmp/out.mp4"]);
    }

    #[test]
    fn diagnostics_are_read_to_the_last_line() {
        let mut noise = "frame dropped\n".repeat(20_000);
        noise.push_str("Conversion failed!\n\n");
        assert!(noise.len() > 64 * 1024);
        assert_eq!(last_line(noise.as_bytes()), "Conversion failed!");
        assert_eq!(last_line(&b""[..]), "");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn audio_adds_pulse_input() {
        let joined = strings(&encoder_args(Path::new("out.mp4"), 2, 2, 30, true)).join(" ");
        assert!(joined.contains("-f pulse -i default"));
        assert!(joined.contains("-c:a aac"));
    }
}
