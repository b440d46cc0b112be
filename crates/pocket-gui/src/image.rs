//! 16-bit images and their file formats.
//!
//! Two on-disk encodings are understood. PNG goes through the `png` crate and
//! is converted channel by channel. The raw format is a four byte header
//! (`u16` width, `u16` height, little-endian) followed by the pixels as
//! little-endian RGB565 words.

use pocket_types::color::Rgb565;
use pocket_types::config::ImageConfig;
use pocket_types::error::{PocketError, Result};
use pocket_vfs::Vfs;

/// Trailing bytes tolerated after a raw image's pixel payload.
pub const DEFAULT_RAW_TOLERANCE: usize = 100;

const PNG_SIGNATURE: [u8; 4] = [0x89, b'P', b'N', b'G'];
const RAW_HEADER_LEN: usize = 4;

/// Options for [`Image::load_from_memory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// A raw buffer may be at most this many bytes longer than its header
    /// declares. Shorter buffers are always rejected.
    pub raw_tolerance: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            raw_tolerance: DEFAULT_RAW_TOLERANCE,
        }
    }
}

impl From<&ImageConfig> for LoadOptions {
    fn from(config: &ImageConfig) -> Self {
        Self {
            raw_tolerance: config.raw_tolerance,
        }
    }
}

fn image_error(message: String) -> PocketError {
    log::error!("{message}");
    PocketError::Image(message)
}

/// An RGB565 image with row-major pixels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Image {
    width: u32,
    height: u32,
    data: Vec<Rgb565>,
}

impl Image {
    /// A black image. Fails instead of aborting when the buffer cannot be
    /// allocated.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let count = width as usize * height as usize;
        let mut data = Vec::new();
        data.try_reserve_exact(count)
            .map_err(|_| image_error(format!("image alloc failed ({width}x{height})")))?;
        data.resize(count, Rgb565::BLACK);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_pixels(width: u32, height: u32, data: Vec<Rgb565>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(image_error(format!(
                "{} pixels do not fill a {width}x{height} image",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgb565] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb565> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get((y * self.width + x) as usize).copied()
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb565) {
        if x < self.width && y < self.height {
            self.data[(y * self.width + x) as usize] = color;
        }
    }

    pub fn load_from_file(vfs: &dyn Vfs, path: &str, options: LoadOptions) -> Result<Self> {
        let data = vfs
            .read(path)
            .map_err(|e| image_error(format!("unable to open image file '{path}': {e}")))?;
        Self::load_from_memory(&data, options)
    }

    /// Decode PNG or raw data, picking the format from the PNG signature.
    pub fn load_from_memory(data: &[u8], options: LoadOptions) -> Result<Self> {
        if data.starts_with(&PNG_SIGNATURE) {
            return Self::decode_png(data);
        }
        if data.len() >= RAW_HEADER_LEN {
            let width = u32::from(u16::from_le_bytes([data[0], data[1]]));
            let height = u32::from(u16::from_le_bytes([data[2], data[3]]));
            let expected = RAW_HEADER_LEN + width as usize * height as usize * 2;
            let slack = data.len().checked_sub(expected);
            if slack.is_some_and(|s| s <= options.raw_tolerance) {
                let pixels = data[RAW_HEADER_LEN..expected]
                    .chunks_exact(2)
                    .map(|p| Rgb565::from_le_bytes([p[0], p[1]]))
                    .collect();
                return Self::from_pixels(width, height, pixels);
            }
        }
        Err(image_error("image format not recognized".to_string()))
    }

    fn decode_png(data: &[u8]) -> Result<Self> {
        let mut decoder = png::Decoder::new(data);
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder
            .read_info()
            .map_err(|e| image_error(format!("PNG parsing failed: {e}")))?;
        let mut buf = vec![0u8; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e| image_error(format!("PNG decoding failed: {e}")))?;

        let channels = match info.color_type {
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            png::ColorType::Indexed => {
                return Err(image_error("PNG palette was not expanded".to_string()));
            },
        };

        let mut image = Self::new(info.width, info.height)?;
        for y in 0..info.height as usize {
            let row = &buf[y * info.line_size..][..info.width as usize * channels];
            for (x, px) in row.chunks_exact(channels).enumerate() {
                let color = if channels < 3 {
                    Rgb565::from_rgb888(px[0], px[0], px[0])
                } else {
                    Rgb565::from_rgb888(px[0], px[1], px[2])
                };
                image.data[y * info.width as usize + x] = color;
            }
        }
        Ok(image)
    }

    /// Encode as an 8-bit RGB PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut rgb = Vec::with_capacity(self.data.len() * 3);
        for px in &self.data {
            let (r, g, b) = px.to_rgb888();
            rgb.extend_from_slice(&[r, g, b]);
        }

        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| image_error(format!("PNG header failed: {e}")))?;
        writer
            .write_image_data(&rgb)
            .map_err(|e| image_error(format!("PNG encoding failed: {e}")))?;
        writer
            .finish()
            .map_err(|e| image_error(format!("PNG encoding failed: {e}")))?;
        Ok(out)
    }

    /// Encode in the raw format. Dimensions must fit in 16 bits.
    pub fn encode_raw(&self) -> Result<Vec<u8>> {
        let (Ok(w), Ok(h)) = (u16::try_from(self.width), u16::try_from(self.height)) else {
            return Err(image_error(format!(
                "{}x{} is too large for the raw format",
                self.width, self.height
            )));
        };
        let mut out = Vec::with_capacity(RAW_HEADER_LEN + self.data.len() * 2);
        out.extend_from_slice(&w.to_le_bytes());
        out.extend_from_slice(&h.to_le_bytes());
        for px in &self.data {
            out.extend_from_slice(&px.to_le_bytes());
        }
        Ok(out)
    }

    /// Save as PNG.
    pub fn save_to_file(&self, vfs: &mut dyn Vfs, path: &str) -> Result<()> {
        let png = self.encode_png()?;
        vfs.write(path, &png)
            .map_err(|e| image_error(format!("unable to write '{path}': {e}")))
    }

    /// Nearest-neighbour resize. A non-positive dimension is derived from the
    /// other one to keep the aspect ratio; both non-positive copies as is.
    pub fn copy_resized(&self, new_width: i32, new_height: i32) -> Result<Self> {
        if self.width == 0 || self.height == 0 {
            return Err(image_error("cannot resize an empty image".to_string()));
        }
        let (w, h) = match (new_width > 0, new_height > 0) {
            (false, false) => return Ok(self.clone()),
            (true, true) => (new_width as u32, new_height as u32),
            (false, true) => {
                let h = new_height as u32;
                ((u64::from(self.width) * u64::from(h) / u64::from(self.height)).max(1) as u32, h)
            },
            (true, false) => {
                let w = new_width as u32;
                (w, (u64::from(self.height) * u64::from(w) / u64::from(self.width)).max(1) as u32)
            },
        };

        let mut out = Self::new(w, h)?;
        for y in 0..h {
            let sy = (u64::from(y) * u64::from(self.height) / u64::from(h)) as u32;
            for x in 0..w {
                let sx = (u64::from(x) * u64::from(self.width) / u64::from(w)) as u32;
                out.data[(y * w + x) as usize] = self.data[(sy * self.width + sx) as usize];
            }
        }
        Ok(out)
    }
}
