use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    panic::{catch_unwind, AssertUnwindSafe},
    path::{Path, PathBuf},
    process::Command,
    sync::mpsc,
    thread::{self, JoinHandle},
};

use chrono::{DateTime, Utc};
use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder};

use crate::raster::Pixmap;

const FILE_PREFIX: &str = "KidDrawingApp_";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write '{}': {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("export worker is not running")]
    WorkerGone,
    #[error("export worker panicked")]
    Panicked,
}

/// A snapshot of the canvas waiting to be written to disk.
#[derive(Debug)]
pub struct ExportJob {
    pub pixmap: Pixmap,
    /// Hand the file to the share command once written.
    pub share: bool,
}

#[derive(Debug)]
pub struct ExportOutcome {
    pub result: Result<PathBuf, ExportError>,
    pub share: bool,
}

pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, ExportError> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(
        pixmap.as_bytes(),
        pixmap.width(),
        pixmap.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(out)
}

/// Encodes `pixmap` and writes it to `dir` as `KidDrawingApp_<unix seconds>.png`.
///
/// Existing files are never overwritten: a `_1`, `_2`, ... suffix is added instead.
pub fn save_png(pixmap: &Pixmap, dir: &Path, at: DateTime<Utc>) -> Result<PathBuf, ExportError> {
    let io_err = |path: &Path| {
        let path = path.to_owned();
        move |source| ExportError::Io { path, source }
    };

    let png = encode_png(pixmap)?;
    fs::create_dir_all(dir).map_err(io_err(dir))?;

    let stem = format!("{FILE_PREFIX}{}", at.timestamp());
    let mut n = 0;
    let (path, file) = loop {
        let path = match n {
            0 => dir.join(format!("{stem}.png")),
            n => dir.join(format!("{stem}_{n}.png")),
        };
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => break (path, file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(io_err(&path)(e)),
        }
    };
    write_new_file(file, &path, &png).map_err(io_err(&path))?;
    Ok(path)
}

/// Writes `bytes` into the just-created `file` at `path`, removing it again if that fails.
fn write_new_file(mut file: impl Write, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let result = file.write_all(bytes).and_then(|()| file.flush());
    if result.is_err() {
        drop(file);
        if let Err(e) = fs::remove_file(path) {
            log::warn!("could not remove incomplete file '{}': {e}", path.display());
        }
    }
    result
}

/// Writes snapshots on a background thread so the event loop never blocks on disk I/O.
///
/// Jobs are processed in submission order. Dropping the exporter finishes any queued jobs
/// before returning.
pub struct Exporter {
    sender: Option<mpsc::Sender<ExportJob>>,
    worker: Option<JoinHandle<()>>,
}

impl Exporter {
    /// Starts the worker. `on_done` is called on the worker thread after every job.
    pub fn spawn(dir: PathBuf, on_done: impl Fn(ExportOutcome) + Send + 'static) -> Self {
        let (sender, receiver) = mpsc::channel::<ExportJob>();
        let worker = thread::Builder::new()
            .name("export".into())
            .spawn(move || {
                for job in receiver {
                    let share = job.share;
                    let result = catch_unwind(AssertUnwindSafe(|| {
                        save_png(&job.pixmap, &dir, Utc::now())
                    }))
                    .unwrap_or(Err(ExportError::Panicked));
                    on_done(ExportOutcome { result, share });
                }
                log::debug!("export worker exiting");
            });

        let worker = match worker {
            Ok(worker) => Some(worker),
            Err(e) => {
                log::error!("could not start export worker: {e}");
                None
            }
        };
        Self {
            sender: Some(sender),
            worker,
        }
    }

    pub fn submit(&self, job: ExportJob) -> Result<(), ExportError> {
        if self.worker.is_none() {
            return Err(ExportError::WorkerGone);
        }
        self.sender
            .as_ref()
            .ok_or(ExportError::WorkerGone)?
            .send(job)
            .map_err(|_| ExportError::WorkerGone)
    }
}

impl Drop for Exporter {
    fn drop(&mut self) {
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            worker.join().ok();
        }
    }
}

/// Launches `command` with `path` appended as its last argument, without waiting for it.
pub fn share_file(command: &[String], path: &Path) -> io::Result<()> {
    let Some((program, args)) = command.split_first() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "share command is empty",
        ));
    };
    let mut child = Command::new(program).args(args).arg(path).spawn()?;
    // Reap the child so it doesn't linger as a zombie.
    thread::spawn(move || child.wait());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use crate::{brush::Color, math::vec2};

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "{}-{}-{name}",
            env!("CARGO_PKG_NAME"),
            std::process::id()
        ));
        fs::remove_dir_all(&dir).ok();
        dir
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn png_decodes_back_to_same_pixels() {
        let mut pm = Pixmap::new(20, 10, Color::WHITE);
        pm.stroke_polyline(&[vec2(2.0, 5.0), vec2(18.0, 5.0)], 4.0, Color::rgb(0xff, 0, 0));

        let png = encode_png(&pm).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (20, 10));
        assert_eq!(decoded.as_raw().as_slice(), pm.as_bytes());
    }

    #[test]
    fn blank_white_export_is_uniform() {
        let dir = scratch_dir("blank");
        let pm = Pixmap::new(32, 24, Color::WHITE);
        let path = save_png(&pm, &dir, at(1_700_000_000)).unwrap();

        assert_eq!(
            path.file_name().unwrap(),
            "KidDrawingApp_1700000000.png"
        );
        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (32, 24));
        assert!(img.pixels().all(|p| p.0 == [0xff; 4]));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn same_second_exports_do_not_overwrite() {
        let dir = scratch_dir("collide");
        let pm = Pixmap::new(4, 4, Color::WHITE);
        let first = save_png(&pm, &dir, at(42)).unwrap();
        let second = save_png(&pm, &dir, at(42)).unwrap();
        let third = save_png(&pm, &dir, at(42)).unwrap();

        assert_eq!(first.file_name().unwrap(), "KidDrawingApp_42.png");
        assert_eq!(second.file_name().unwrap(), "KidDrawingApp_42_1.png");
        assert_eq!(third.file_name().unwrap(), "KidDrawingApp_42_2.png");
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unwritable_directory_is_reported() {
        let dir = scratch_dir("blocked");
        fs::create_dir_all(dir.parent().unwrap()).unwrap();
        // A regular file where the directory should be.
        fs::write(&dir, b"").unwrap();

        let err = save_png(&Pixmap::new(1, 1, Color::WHITE), &dir, at(0)).unwrap_err();
        assert!(matches!(err, ExportError::Io { ref path, .. } if path == &dir));
        fs::remove_file(&dir).ok();
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_leaves_no_file() {
        let dir = scratch_dir("full");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("KidDrawingApp_1.png");
        fs::write(&path, b"").unwrap();

        let err = write_new_file(FullDisk, &path, b"png bytes").unwrap_err();
        assert_eq!(err.to_string(), "no space left on device");
        assert!(!path.exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn worker_reports_each_job() {
        let dir = scratch_dir("worker");
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let exporter = Exporter::spawn(dir.clone(), move |outcome| {
            tx.lock().unwrap().send(outcome).ok();
        });

        for share in [false, true] {
            exporter
                .submit(ExportJob {
                    pixmap: Pixmap::new(8, 8, Color::WHITE),
                    share,
                })
                .unwrap();
        }

        let first = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(!first.share);
        assert!(second.share);
        let (a, b) = (first.result.unwrap(), second.result.unwrap());
        assert_ne!(a, b);
        assert!(a.exists() && b.exists());

        drop(exporter);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_share_command_is_rejected() {
        let err = share_file(&[], Path::new("x.png")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
