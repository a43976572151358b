//! Page images of scanned PDFs, pulled out of the page resources with lopdf.
//!
//! A scanned lab report is usually one image XObject per page (JPEG, or raw
//! pixels behind FlateDecode). The largest image on a page is taken as the scan.

use image::{DynamicImage, ImageOutputFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::types::PdfPageRenderer;
use super::ExtractionError;

pub struct LopdfImageExtractor;

impl PdfPageRenderer for LopdfImageExtractor {
    fn page_images(&self, pdf_bytes: &[u8]) -> Result<Vec<Vec<u8>>, ExtractionError> {
        let doc = Document::load_mem(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(format!("Failed to parse PDF: {e}")))?;

        let mut images = Vec::new();
        for (index, page_id) in doc.page_iter().enumerate() {
            match page_image_png(&doc, page_id) {
                Ok(Some(png)) => {
                    tracing::debug!(page = index, png_size = png.len(), "Extracted page image");
                    images.push(png);
                }
                Ok(None) => tracing::debug!(page = index, "No image on page, skipping"),
                Err(e) => tracing::warn!(page = index, error = %e, "Unreadable page image, skipping"),
            }
        }
        Ok(images)
    }
}

fn page_image_png(doc: &Document, page_id: ObjectId) -> Result<Option<Vec<u8>>, ExtractionError> {
    let Some(stream) = largest_image_stream(doc, page_id) else {
        return Ok(None);
    };

    let img = decode_image_stream(doc, stream)?;
    let mut png = std::io::Cursor::new(Vec::new());
    img.write_to(&mut png, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encode failed: {e}")))?;
    Ok(Some(png.into_inner()))
}

/// Page dict → /Resources → /XObject → largest stream with /Subtype /Image.
fn largest_image_stream(doc: &Document, page_id: ObjectId) -> Option<&Stream> {
    let page = doc.get_object(page_id).ok()?.as_dict().ok()?;
    let resources = resolve_dict(doc, page, b"Resources")?;
    let xobjects = resolve_dict(doc, resources, b"XObject")?;

    xobjects
        .iter()
        .filter_map(|(_, obj)| match resolve(doc, obj) {
            Object::Stream(s) if is_image(&s.dict) => Some(s),
            _ => None,
        })
        .max_by_key(|s| s.content.len())
}

fn is_image(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image")
}

fn has_filter(dict: &Dictionary, name: &[u8]) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(n)) => n == name,
        Ok(Object::Array(arr)) => arr
            .iter()
            .any(|o| matches!(o, Object::Name(n) if n == name)),
        _ => false,
    }
}

fn decode_image_stream(doc: &Document, stream: &Stream) -> Result<DynamicImage, ExtractionError> {
    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    // DCTDecode streams are complete JPEG files.
    if has_filter(&stream.dict, b"DCTDecode") {
        return image::load_from_memory(&content)
            .map_err(|e| ExtractionError::ImageProcessing(format!("JPEG decode failed: {e}")));
    }

    if let Ok(img) = image::load_from_memory(&content) {
        return Ok(img);
    }
    raw_pixels_to_image(doc, &stream.dict, content)
}

fn raw_pixels_to_image(
    doc: &Document,
    dict: &Dictionary,
    pixels: Vec<u8>,
) -> Result<DynamicImage, ExtractionError> {
    let width = get_u32(dict, b"Width")?;
    let height = get_u32(dict, b"Height")?;
    let bpc = dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    if bpc != 8 {
        return Err(ExtractionError::ImageProcessing(format!(
            "Unsupported bits per component: {bpc}"
        )));
    }

    let channels = color_channels(doc, dict)?;
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(channels))
        .ok_or_else(|| {
            ExtractionError::ImageProcessing(format!(
                "Image dimensions overflow: {width}x{height}x{channels}"
            ))
        })?;
    if pixels.len() < expected {
        return Err(ExtractionError::ImageProcessing(format!(
            "Raw pixel buffer too small: {} bytes, expected {expected}",
            pixels.len()
        )));
    }

    let mut pixels = pixels;
    pixels.truncate(expected);
    let too_small = || ExtractionError::ImageProcessing("Pixel buffer mismatch".into());
    let img = match channels {
        1 => DynamicImage::ImageLuma8(
            image::GrayImage::from_raw(width, height, pixels).ok_or_else(too_small)?,
        ),
        3 => DynamicImage::ImageRgb8(
            image::RgbImage::from_raw(width, height, pixels).ok_or_else(too_small)?,
        ),
        // CMYK read as RGBA; colour accuracy is irrelevant for recognition.
        4 => DynamicImage::ImageRgba8(
            image::RgbaImage::from_raw(width, height, pixels).ok_or_else(too_small)?,
        ),
        n => {
            return Err(ExtractionError::ImageProcessing(format!(
                "Unsupported channel count: {n}"
            )))
        }
    };
    Ok(img)
}

fn color_channels(doc: &Document, dict: &Dictionary) -> Result<usize, ExtractionError> {
    let Ok(cs) = dict.get(b"ColorSpace") else {
        return Ok(3);
    };
    let channels = match resolve(doc, cs) {
        Object::Name(n) => match n.as_slice() {
            b"DeviceGray" => 1,
            b"DeviceCMYK" => 4,
            _ => 3,
        },
        Object::Array(arr) => match arr.first() {
            Some(Object::Name(n)) if n == b"ICCBased" => {
                let declared = arr
                    .get(1)
                    .map(|o| resolve(doc, o))
                    .and_then(|o| o.as_stream().ok())
                    .and_then(|s| s.dict.get(b"N").and_then(Object::as_i64).ok());
                match declared {
                    None => 3,
                    Some(n @ 1..=4) => n as usize,
                    Some(n) => {
                        return Err(ExtractionError::ImageProcessing(format!(
                            "Invalid ICC component count: {n}"
                        )))
                    }
                }
            }
            Some(Object::Name(n)) if n == b"Indexed" => 1,
            _ => 3,
        },
        _ => 3,
    };
    Ok(channels)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn resolve_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    resolve(doc, dict.get(key).ok()?).as_dict().ok()
}

fn get_u32(dict: &Dictionary, key: &[u8]) -> Result<u32, ExtractionError> {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            ExtractionError::PdfParsing(format!(
                "Missing or invalid /{} in image dictionary",
                String::from_utf8_lossy(key)
            ))
        })
}


#[cfg(test)]
mod tests {
    use super::fixtures::{jpeg, scanned_pdf};
    use super::*;
    use crate::pipeline::extraction::pdf::fixtures::text_pdf;
    use image::GenericImageView;
    use lopdf::dictionary;

    #[test]
    fn extractor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LopdfImageExtractor>();
    }

    #[test]
    fn extracts_scan_from_each_page() {
        let pdf = scanned_pdf(&[
            vec![(200, 300, jpeg(200, 300))],
            vec![(120, 80, jpeg(120, 80))],
        ]);
        let images = LopdfImageExtractor.page_images(&pdf).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(&images[0][0..4], b"\x89PNG");

        let first = image::load_from_memory(&images[0]).unwrap();
        assert_eq!(first.dimensions(), (200, 300));
        let second = image::load_from_memory(&images[1]).unwrap();
        assert_eq!(second.dimensions(), (120, 80));
    }

    #[test]
    fn largest_image_wins() {
        let pdf = scanned_pdf(&[vec![
            (10, 10, jpeg(10, 10)),
            (200, 300, jpeg(200, 300)),
        ]]);
        let images = LopdfImageExtractor.page_images(&pdf).unwrap();
        let img = image::load_from_memory(&images[0]).unwrap();
        assert_eq!(img.dimensions(), (200, 300));
    }

    #[test]
    fn text_only_pdf_yields_no_images() {
        let pdf = text_pdf(&["Hello"]);
        let images = LopdfImageExtractor.page_images(&pdf).unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = LopdfImageExtractor.page_images(b"%PDF-garbage").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn raw_gray_pixels_are_reconstructed() {
        let doc = Document::with_version("1.4");
        let dict = lopdf::dictionary! {
            "Width" => 4,
            "Height" => 2,
            "BitsPerComponent" => 8,
            "ColorSpace" => "DeviceGray",
        };
        let img = raw_pixels_to_image(&doc, &dict, vec![128u8; 8]).unwrap();
        assert_eq!(img.dimensions(), (4, 2));
    }

    #[test]
    fn oversized_dimensions_are_an_error() {
        let doc = Document::with_version("1.4");
        let dict = lopdf::dictionary! {
            "Width" => 4_000_000_000i64,
            "Height" => 4_000_000_000i64,
            "BitsPerComponent" => 8,
            "ColorSpace" => "DeviceCMYK",
        };
        let err = raw_pixels_to_image(&doc, &dict, vec![0u8; 16]).unwrap_err();
        assert!(matches!(err, ExtractionError::ImageProcessing(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn icc_component_count_must_be_sane() {
        let mut doc = Document::with_version("1.4");
        let icc = doc.add_object(Stream::new(lopdf::dictionary! { "N" => -3 }, Vec::new()));
        let dict = lopdf::dictionary! {
            "Width" => 2,
            "Height" => 2,
            "BitsPerComponent" => 8,
            "ColorSpace" => vec![Object::Name(b"ICCBased".to_vec()), Object::Reference(icc)],
        };
        assert!(color_channels(&doc, &dict).is_err());
        assert!(raw_pixels_to_image(&doc, &dict, vec![0u8; 64]).is_err());

        let icc = doc.add_object(Stream::new(lopdf::dictionary! { "N" => 1 }, Vec::new()));
        let dict = lopdf::dictionary! {
            "ColorSpace" => vec![Object::Name(b"ICCBased".to_vec()), Object::Reference(icc)],
        };
        assert_eq!(color_channels(&doc, &dict).unwrap(), 1);
    }

    #[test]
    fn short_raw_buffer_is_rejected() {
        let doc = Document::with_version("1.4");
        let dict = lopdf::dictionary! { "Width" => 4, "Height" => 4 };
        assert!(raw_pixels_to_image(&doc, &dict, vec![0u8; 5]).is_err());
    }
}
