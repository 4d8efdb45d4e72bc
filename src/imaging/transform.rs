//! Decode, crop, resize and round a photo for display.

use image::error::{DecodingError, ImageFormatHint};
use image::imageops::FilterType;
use image::{
    DynamicImage, GenericImageView, GrayImage, ImageBuffer, ImageError, ImageFormat, ImageReader,
    ImageResult, Luma, RgbImage, RgbaImage,
};
use jpeg_decoder::PixelFormat;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Cache prefix for gallery thumbnails.
pub const GALLERY_PREFIX: &str = "gallery_";

const THUMBNAIL_SIZE: u32 = 128;
const THUMBNAIL_RADIUS: u32 = 15;

/// How a source image should be shaped before display.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSpec {
    density: f32,
    target_width: u32,
    target_height: u32,
    center_crop: bool,
    high_quality: bool,
    rounded_corner: u32,
    prefix: String,
    fallback: usize,
}

impl TransformSpec {
    /// An empty spec: no resize, no crop, high quality, no prefix.
    /// Target sizes set later are multiplied by `density`.
    pub fn new(density: f32) -> Self {
        Self {
            density,
            target_width: 0,
            target_height: 0,
            center_crop: false,
            high_quality: true,
            rounded_corner: 0,
            prefix: String::new(),
            fallback: 0,
        }
    }

    /// Square, rounded thumbnail used in the day list.
    pub fn list_thumbnail(density: f32) -> Self {
        Self::new(density)
            .target_width(THUMBNAIL_SIZE)
            .target_height(THUMBNAIL_SIZE)
            .center_crop(true)
            .high_quality(true)
            .rounded_corner(THUMBNAIL_RADIUS)
    }

    /// Square, rounded thumbnail in the gallery, cached apart from the list one.
    pub fn gallery_thumbnail(density: f32, size: u32) -> Self {
        Self::new(density)
            .target_width(size)
            .target_height(size)
            .center_crop(true)
            .high_quality(true)
            .rounded_corner(THUMBNAIL_RADIUS)
            .prefix(GALLERY_PREFIX)
    }

    /// Full-width square photo shown with an entry.
    pub fn entry_photo(density: f32, width: u32) -> Self {
        Self::new(density)
            .target_width(width)
            .target_height(width)
            .center_crop(true)
            .high_quality(true)
    }

    fn scaled(&self, pixels: u32) -> u32 {
        (pixels as f32 * self.density).round() as u32
    }

    pub fn target_width(mut self, width: u32) -> Self {
        self.target_width = self.scaled(width);
        self
    }

    pub fn target_height(mut self, height: u32) -> Self {
        self.target_height = self.scaled(height);
        self
    }

    pub fn center_crop(mut self, center_crop: bool) -> Self {
        self.center_crop = center_crop;
        self
    }

    /// Slow, fine resampling to the exact target size. Without it the image
    /// is only subsampled towards the target.
    pub fn high_quality(mut self, high_quality: bool) -> Self {
        self.high_quality = high_quality;
        self
    }

    pub fn rounded_corner(mut self, radius: u32) -> Self {
        self.rounded_corner = radius;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Which default placeholder to show while loading or when there is no path.
    pub fn fallback(mut self, index: usize) -> Self {
        self.fallback = index;
        self
    }

    pub fn width(&self) -> u32 {
        self.target_width
    }

    pub fn height(&self) -> u32 {
        self.target_height
    }

    pub fn is_center_crop(&self) -> bool {
        self.center_crop
    }

    pub fn is_high_quality(&self) -> bool {
        self.high_quality
    }

    pub fn corner_radius(&self) -> u32 {
        self.rounded_corner
    }

    pub fn fallback_index(&self) -> usize {
        self.fallback
    }

    pub fn cache_key(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path)
    }
}

/// Integer subsampling factor that shrinks `width`x`height` towards the
/// target without going below it. 1 means no subsampling.
pub fn sample_size(width: u32, height: u32, target_width: u32, target_height: u32) -> u32 {
    if target_width == 0 || width <= target_width {
        return 1;
    }
    let mut ratio = width / target_width;
    if target_height > 0 {
        if height <= target_height {
            return 1;
        }
        ratio = ratio.min(height / target_height);
    }
    ratio.max(1)
}

/// EXIF orientation (1-8) of a camera photo, 1 when absent or unreadable.
fn read_exif_orientation(path: &Path) -> u32 {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return 1,
    };

    let mut reader = BufReader::new(file);
    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(e) => e,
        Err(_) => return 1,
    };

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1)
}

fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        6 => img.rotate90(),
        3 => img.rotate180(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Size of a `width`x`height` image once `orientation` has been applied.
fn upright(width: u32, height: u32, orientation: u32) -> (u32, u32) {
    match orientation {
        6 | 8 => (height, width),
        _ => (width, height),
    }
}

fn jpeg_error(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> ImageError {
    ImageError::Decoding(DecodingError::new(
        ImageFormatHint::Exact(ImageFormat::Jpeg),
        e,
    ))
}

/// Largest JPEG scale denominator (1, 2, 4 or 8) not above `sample`.
fn jpeg_denominator(sample: u32) -> u32 {
    [8, 4, 2].into_iter().find(|d| *d <= sample).unwrap_or(1)
}

fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(cmyk.len() / 4 * 3);
    for pixel in cmyk.chunks_exact(4) {
        let k = 255 - u16::from(pixel[3]);
        for channel in &pixel[..3] {
            rgb.push(((255 - u16::from(*channel)) * k / 255) as u8);
        }
    }
    rgb
}

/// Decode a JPEG straight at a reduced scale, so the full-size picture never
/// sits in memory. The scale keeps the upright image at or above the target.
pub fn decode_jpeg(
    path: &Path,
    orientation: u32,
    target_width: u32,
    target_height: u32,
) -> ImageResult<DynamicImage> {
    let file = BufReader::new(File::open(path)?);
    let mut decoder = jpeg_decoder::Decoder::new(file);
    decoder.read_info().map_err(jpeg_error)?;
    let info = decoder
        .info()
        .ok_or_else(|| jpeg_error("missing JPEG header"))?;

    let (width, height) = (u32::from(info.width), u32::from(info.height));
    let (upright_width, upright_height) = upright(width, height, orientation);
    let denominator = jpeg_denominator(sample_size(
        upright_width,
        upright_height,
        target_width,
        target_height,
    ));

    let (out_width, out_height) = if denominator > 1 {
        let requested = (width.div_ceil(denominator), height.div_ceil(denominator));
        let (w, h) = decoder
            .scale(requested.0 as u16, requested.1 as u16)
            .map_err(jpeg_error)?;
        (u32::from(w), u32::from(h))
    } else {
        (width, height)
    };

    let pixels = decoder.decode().map_err(jpeg_error)?;
    let mismatch = || jpeg_error("decoded size does not match header");
    let img = match info.pixel_format {
        PixelFormat::L8 => DynamicImage::ImageLuma8(
            GrayImage::from_raw(out_width, out_height, pixels).ok_or_else(mismatch)?,
        ),
        PixelFormat::L16 => {
            let samples = pixels
                .chunks_exact(2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .collect();
            DynamicImage::ImageLuma16(
                ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(out_width, out_height, samples)
                    .ok_or_else(mismatch)?,
            )
        }
        PixelFormat::RGB24 => DynamicImage::ImageRgb8(
            RgbImage::from_raw(out_width, out_height, pixels).ok_or_else(mismatch)?,
        ),
        PixelFormat::CMYK32 => DynamicImage::ImageRgb8(
            RgbImage::from_raw(out_width, out_height, cmyk_to_rgb(&pixels))
                .ok_or_else(mismatch)?,
        ),
    };
    Ok(img)
}

/// Decode `path`, upright, subsampled towards the spec's target size.
///
/// JPEGs are scaled down while decoding; other formats are decoded in full
/// and subsampled right after.
pub fn decode(path: &Path, spec: &TransformSpec) -> ImageResult<DynamicImage> {
    let orientation = read_exif_orientation(path);
    let reader = ImageReader::open(path)?.with_guessed_format()?;

    let img = if reader.format() == Some(ImageFormat::Jpeg) && spec.width() != 0 {
        decode_jpeg(path, orientation, spec.width(), spec.height())?
    } else {
        reader.decode()?
    };

    let (width, height) = img.dimensions();
    let (upright_width, upright_height) = upright(width, height, orientation);
    let sample = sample_size(upright_width, upright_height, spec.width(), spec.height());
    let img = if sample > 1 {
        img.resize_exact(width / sample, height / sample, FilterType::Nearest)
    } else {
        img
    };
    Ok(apply_orientation(img, orientation))
}

/// Largest centered square.
pub fn center_crop(img: &DynamicImage) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width >= height {
        img.crop_imm(width / 2 - height / 2, 0, height, height)
    } else {
        img.crop_imm(0, height / 2 - width / 2, width, width)
    }
}

/// Make everything outside rounded corners of `radius` transparent,
/// with an anti-aliased edge.
pub fn round_corners(mut img: RgbaImage, radius: u32) -> RgbaImage {
    let (width, height) = img.dimensions();
    let r = radius.min(width / 2).min(height / 2) as f32;
    if r <= 0.0 {
        return img;
    }
    let (w, h) = (width as f32, height as f32);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let px = x as f32 + 0.5;
        let py = y as f32 + 0.5;
        let cx = if px < r {
            r
        } else if px > w - r {
            w - r
        } else {
            continue;
        };
        let cy = if py < r {
            r
        } else if py > h - r {
            h - r
        } else {
            continue;
        };

        let distance = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
        let coverage = (r - distance + 0.5).clamp(0.0, 1.0);
        pixel[3] = (f32::from(pixel[3]) * coverage).round() as u8;
    }
    img
}

/// The full pipeline: decode, crop, resize, round.
pub fn process(path: &Path, spec: &TransformSpec) -> ImageResult<RgbaImage> {
    let mut img = decode(path, spec)?;

    if spec.is_center_crop() {
        img = center_crop(&img);
    }

    if spec.is_high_quality() && spec.width() != 0 && spec.height() != 0 {
        img = img.resize_exact(spec.width(), spec.height(), FilterType::Lanczos3);
    }

    let img = img.to_rgba8();
    if spec.corner_radius() != 0 {
        return Ok(round_corners(img, spec.corner_radius()));
    }
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        img.save(&path).unwrap();
        path
    }

    fn write_jpeg(dir: &TempDir, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_density_scales_targets() {
        let spec = TransformSpec::new(1.5).target_width(128).target_height(100);
        assert_eq!(spec.width(), 192);
        assert_eq!(spec.height(), 150);
    }

    #[test]
    fn test_presets() {
        let list = TransformSpec::list_thumbnail(1.0);
        assert_eq!((list.width(), list.height()), (128, 128));
        assert!(list.is_center_crop());
        assert_eq!(list.corner_radius(), 15);
        assert_eq!(list.cache_key("/a.jpg"), "/a.jpg");

        let gallery = TransformSpec::gallery_thumbnail(2.0, 100);
        assert_eq!(gallery.width(), 200);
        assert_eq!(gallery.cache_key("/a.jpg"), "gallery_/a.jpg");

        let photo = TransformSpec::entry_photo(1.0, 480);
        assert_eq!(photo.corner_radius(), 0);
        assert!(photo.is_high_quality());
    }

    #[test]
    fn test_sample_size() {
        assert_eq!(sample_size(4000, 3000, 0, 0), 1);
        assert_eq!(sample_size(100, 100, 128, 128), 1);
        assert_eq!(sample_size(4000, 3000, 128, 128), 23);
        assert_eq!(sample_size(1000, 1000, 300, 300), 3);
        // Height is already close to the target.
        assert_eq!(sample_size(1000, 400, 300, 300), 1);
        assert_eq!(sample_size(1000, 400, 300, 0), 3);
    }

    #[test]
    fn test_center_crop_landscape_and_portrait() {
        let wide = DynamicImage::ImageRgba8(RgbaImage::new(300, 100));
        let cropped = center_crop(&wide);
        assert_eq!(cropped.dimensions(), (100, 100));

        let tall = DynamicImage::ImageRgba8(RgbaImage::new(80, 200));
        assert_eq!(center_crop(&tall).dimensions(), (80, 80));
    }

    #[test]
    fn test_center_crop_takes_the_middle() {
        let img = RgbaImage::from_fn(30, 10, |x, _| {
            if (10..20).contains(&x) {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let cropped = center_crop(&DynamicImage::ImageRgba8(img)).to_rgba8();
        assert!(cropped.pixels().all(|p| *p == Rgba([255, 0, 0, 255])));
    }

    #[test]
    fn test_round_corners() {
        let img = RgbaImage::from_pixel(64, 64, Rgba([10, 20, 30, 255]));
        let rounded = round_corners(img, 16);

        assert_eq!(rounded.get_pixel(0, 0)[3], 0);
        assert_eq!(rounded.get_pixel(63, 63)[3], 0);
        assert_eq!(rounded.get_pixel(32, 32)[3], 255);
        assert_eq!(rounded.get_pixel(32, 0)[3], 255);
        assert_eq!(rounded.get_pixel(0, 32)[3], 255);
        assert_eq!(rounded.get_pixel(0, 0).0[..3], [10, 20, 30]);
    }

    #[test]
    fn test_round_corners_zero_radius_is_identity() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]));
        assert_eq!(round_corners(img.clone(), 0), img);
    }

    #[test]
    fn test_process_thumbnail() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "wide.png", 600, 400);

        let out = process(&path, &TransformSpec::list_thumbnail(1.0)).unwrap();
        assert_eq!(out.dimensions(), (128, 128));
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(64, 64)[3], 255);
    }

    #[test]
    fn test_process_low_quality_only_subsamples() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "big.png", 400, 400);
        let spec = TransformSpec::new(1.0)
            .target_width(100)
            .target_height(100)
            .high_quality(false);

        let out = process(&path, &spec).unwrap();
        assert_eq!(out.dimensions(), (100, 100));

        let spec = TransformSpec::new(1.0)
            .target_width(150)
            .target_height(150)
            .high_quality(false);
        let out = process(&path, &spec).unwrap();
        assert_eq!(out.dimensions(), (200, 200));
    }

    #[test]
    fn test_process_without_target_keeps_size() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "plain.png", 40, 30);

        let out = process(&path, &TransformSpec::new(1.0)).unwrap();
        assert_eq!(out.dimensions(), (40, 30));
    }

    #[test]
    fn test_process_missing_or_corrupt_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(process(&dir.path().join("nope.jpg"), &TransformSpec::new(1.0)).is_err());

        let garbage = dir.path().join("garbage.jpg");
        std::fs::write(&garbage, b"definitely not a jpeg").unwrap();
        assert!(process(&garbage, &TransformSpec::new(1.0)).is_err());
    }

    #[test]
    fn test_jpeg_denominator() {
        assert_eq!(jpeg_denominator(1), 1);
        assert_eq!(jpeg_denominator(3), 2);
        assert_eq!(jpeg_denominator(6), 4);
        assert_eq!(jpeg_denominator(23), 8);
    }

    #[test]
    fn test_upright_swaps_for_quarter_turns() {
        assert_eq!(upright(4000, 3000, 1), (4000, 3000));
        assert_eq!(upright(4000, 3000, 3), (4000, 3000));
        assert_eq!(upright(4000, 3000, 6), (3000, 4000));
        assert_eq!(upright(4000, 3000, 8), (3000, 4000));
    }

    #[test]
    fn test_large_jpeg_is_decoded_at_reduced_scale() {
        let dir = TempDir::new().unwrap();
        let path = write_jpeg(&dir, "camera.jpg", 1024, 768);

        // A whole-image decode would be 1024x768.
        let img = decode_jpeg(&path, 1, 128, 128).unwrap();
        assert_eq!(img.dimensions(), (256, 192));

        let spec = TransformSpec::list_thumbnail(1.0);
        assert_eq!(decode(&path, &spec).unwrap().dimensions(), (256, 192));
        assert_eq!(process(&path, &spec).unwrap().dimensions(), (128, 128));
    }

    #[test]
    fn test_jpeg_near_target_is_decoded_in_full() {
        let dir = TempDir::new().unwrap();
        let path = write_jpeg(&dir, "small.jpg", 200, 150);

        assert_eq!(decode_jpeg(&path, 1, 128, 128).unwrap().dimensions(), (200, 150));
        let img = decode(&path, &TransformSpec::new(1.0)).unwrap();
        assert_eq!(img.dimensions(), (200, 150));
    }

    #[test]
    fn test_cmyk_to_rgb() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0]), vec![255, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[255, 0, 0, 0]), vec![0, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), vec![0, 0, 0]);
    }
}
