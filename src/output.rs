use crate::error::{Error, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

pub fn frame_file_name(frame: u32) -> String {
    format!("frame_{:04}.png", frame)
}

/// Bytes of a tightly packed RGBA8 frame.
fn frame_byte_size(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

struct Frame {
    index: u32,
    pixels: Vec<u8>,
}

/// Collects read back frames and writes them as PNG files, one batch at a
/// time on the rayon pool.
pub struct FrameWriter {
    output_dir: PathBuf,
    width: u32,
    height: u32,
    batch_size: usize,
    pending: Vec<Frame>,
    written: usize,
}

impl FrameWriter {
    pub fn new(output_dir: &Path, width: u32, height: u32, batch_size: usize) -> Result<Self> {
        fs::create_dir_all(output_dir)?;
        Ok(FrameWriter {
            output_dir: output_dir.to_path_buf(),
            width,
            height,
            batch_size: batch_size.max(1),
            pending: Vec::with_capacity(batch_size),
            written: 0,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Queues tightly packed RGBA8 pixels of `frame`.
    pub fn push(&mut self, index: u32, pixels: Vec<u8>) -> Result<()> {
        let expected = frame_byte_size(self.width, self.height);
        if pixels.len() != expected {
            return Err(Error::FrameSize {
                frame: index,
                len: pixels.len(),
                expected,
            });
        }
        self.pending.push(Frame { index, pixels });
        if self.pending.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let frames = std::mem::take(&mut self.pending);
        let (width, height) = (self.width, self.height);
        let output_dir = &self.output_dir;

        frames
            .par_iter()
            .map(|frame| -> Result<()> {
                let path = output_dir.join(frame_file_name(frame.index));
                image::save_buffer(
                    &path,
                    &frame.pixels,
                    width,
                    height,
                    image::ColorType::Rgba8,
                )?;
                Ok(())
            })
            .collect::<Result<Vec<()>>>()?;

        self.written += frames.len();
        log::debug!(
            "Wrote frames {}..={} to {}",
            frames[0].index,
            frames[frames.len() - 1].index,
            output_dir.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rtengine-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        rgba.repeat((width * height) as usize)
    }

    #[test]
    fn names_are_zero_padded() {
        assert_eq!(frame_file_name(0), "frame_0000.png");
        assert_eq!(frame_file_name(42), "frame_0042.png");
        assert_eq!(frame_file_name(12345), "frame_12345.png");
    }

    #[test]
    fn writes_once_the_batch_is_full() {
        let dir = scratch_dir("batch");
        let mut writer = FrameWriter::new(&dir, 4, 2, 2).unwrap();

        writer.push(0, solid(4, 2, [255, 0, 0, 255])).unwrap();
        assert_eq!(writer.written(), 0);
        assert!(!dir.join(frame_file_name(0)).exists());

        writer.push(1, solid(4, 2, [0, 255, 0, 255])).unwrap();
        assert_eq!(writer.written(), 2);

        writer.push(2, solid(4, 2, [0, 0, 255, 255])).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.written(), 3);

        let decoded = image::open(dir.join(frame_file_name(1))).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 2));
        assert_eq!(decoded.get_pixel(3, 1).0, [0, 255, 0, 255]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_frames_of_the_wrong_size() {
        let dir = scratch_dir("size");
        let mut writer = FrameWriter::new(&dir, 4, 4, 1).unwrap();
        let result = writer.push(0, vec![0; 10]);
        assert!(matches!(result, Err(Error::FrameSize { expected: 64, .. })));
        assert_eq!(writer.written(), 0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn frame_size_does_not_wrap_at_u32() {
        assert_eq!(frame_byte_size(70_000, 70_000), 19_600_000_000);
        assert_eq!(frame_byte_size(1280, 720), 3_686_400);
    }

    #[test]
    fn flushing_nothing_is_a_no_op() {
        let dir = scratch_dir("empty");
        let mut writer = FrameWriter::new(&dir, 1, 1, 4).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.written(), 0);
        fs::remove_dir_all(&dir).unwrap();
    }
}
