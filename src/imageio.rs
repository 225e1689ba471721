use crate::error::{Error, Result};
use image::{ImageFormat, imageops::FilterType};
use kornia_image::{Image, ImageSize, allocator::CpuAllocator};
use std::{io::Cursor, path::Path};

/// Decoded RGB8 image as handed to the classifier.
pub type RgbImage8 = Image<u8, 3, CpuAllocator>;

/// File extensions accepted for uploads and samples.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Whether a file name ends in one of the supported extensions (case-insensitive).
pub fn has_supported_extension(name: &str) -> bool {
    let name = name.to_lowercase();
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|ext| name.ends_with(&format!(".{ext}")))
}

/// MIME type for a supported file name.
pub fn content_type(name: &str) -> &'static str {
    if name.to_lowercase().ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

/// Reads a JPEG or PNG file into an RGB8 image.
pub fn read_image_from_path(path: &Path) -> Result<RgbImage8> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;

    let read_error = |reason: String| Error::ImageRead {
        path: path.to_path_buf(),
        reason,
    };

    match extension.as_str() {
        "jpg" | "jpeg" => {
            kornia_io::jpeg::read_image_jpeg_rgb8(path).map_err(|e| read_error(e.to_string()))
        }
        "png" => kornia_io::png::read_image_png_rgb8(path).map_err(|e| read_error(e.to_string())),
        _ => Err(Error::UnsupportedFormat(extension)),
    }
}

/// Decodes an uploaded JPEG or PNG payload.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<RgbImage8> {
    let decoded = image::load_from_memory(bytes).map_err(|e| Error::ImageDecode(e.to_string()))?;
    from_rgb_buffer(decoded.to_rgb8())
}

pub fn from_rgb_buffer(buffer: image::RgbImage) -> Result<RgbImage8> {
    let (width, height) = buffer.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::ImageDecode("image has no pixels".to_string()));
    }
    Image::new(
        ImageSize {
            width: width as usize,
            height: height as usize,
        },
        buffer.into_raw(),
        CpuAllocator,
    )
    .map_err(|e| Error::ImageDecode(e.to_string()))
}

pub fn to_rgb_buffer(image: &RgbImage8) -> Result<image::RgbImage> {
    image::RgbImage::from_raw(
        image.width() as u32,
        image.height() as u32,
        image.as_slice().to_vec(),
    )
    .ok_or_else(|| Error::ImageDecode("pixel buffer does not match image size".to_string()))
}

/// Resizes to `size`×`size` ignoring aspect ratio.
pub fn resize_exact(image: &RgbImage8, size: u32) -> Result<image::RgbImage> {
    let buffer = to_rgb_buffer(image)?;
    Ok(image::imageops::resize(&buffer, size, size, FilterType::Triangle))
}

/// Encodes a square PNG thumbnail.
pub fn thumbnail_png(image: &RgbImage8, size: u32) -> Result<Vec<u8>> {
    let thumbnail = resize_exact(image, size)?;
    let mut out = Cursor::new(Vec::new());
    thumbnail
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| Error::ImageDecode(e.to_string()))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(width: u32, height: u32) -> image::RgbImage {
        image::RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        })
    }

    fn encode(buffer: &image::RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        buffer.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(has_supported_extension("cat.jpg"));
        assert!(has_supported_extension("CAT.JPEG"));
        assert!(has_supported_extension("leaf.Png"));
        assert!(!has_supported_extension("notes.txt"));
        assert!(!has_supported_extension("png"));
        assert!(!has_supported_extension("image.gif"));
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type("a.PNG"), "image/png");
        assert_eq!(content_type("a.jpeg"), "image/jpeg");
        assert_eq!(content_type("a.jpg"), "image/jpeg");
    }

    #[test]
    fn decodes_png_bytes() {
        let bytes = encode(&checkerboard(6, 4), ImageFormat::Png);
        let image = decode_image_bytes(&bytes).unwrap();
        assert_eq!(image.width(), 6);
        assert_eq!(image.height(), 4);
        assert_eq!(&image.as_slice()[..3], &[255, 255, 255]);
        assert_eq!(&image.as_slice()[3..6], &[0, 0, 0]);
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(matches!(
            decode_image_bytes(b"definitely not an image"),
            Err(Error::ImageDecode(_))
        ));
    }

    #[test]
    fn buffer_conversion_keeps_pixels() {
        let buffer = checkerboard(3, 5);
        let image = from_rgb_buffer(buffer.clone()).unwrap();
        assert_eq!(to_rgb_buffer(&image).unwrap(), buffer);
    }

    #[test]
    fn thumbnail_is_square_png() {
        let image = from_rgb_buffer(checkerboard(40, 20)).unwrap();
        let bytes = thumbnail_png(&image, 12).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 12));
    }

    #[test]
    fn reads_png_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.png");
        checkerboard(8, 8).save(&path).unwrap();

        let image = read_image_from_path(&path).unwrap();
        assert_eq!((image.width(), image.height()), (8, 8));
    }

    #[test]
    fn unsupported_path_extension_is_rejected() {
        let path = Path::new("sample.gif");
        assert!(matches!(
            read_image_from_path(path),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
