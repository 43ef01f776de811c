// SPDX-License-Identifier: GPL-3.0-only

//! Barcode detection task
//!
//! QR codes go through `rqrr`; the linear (EAN, UPC, Code 39/93/128,
//! Codabar, ITF), stacked (PDF417) and remaining 2D formats (Aztec,
//! Data Matrix) go through `rxing`. Images are downscaled before decoding so
//! a large picked photo costs the same as a camera frame.

use crate::app::frame_processor::types::{BarcodeFormat, DecodedBarcode};
use crate::constants::decoding;
use crate::errors::DecodeError;
use image::GrayImage;
use image::imageops::{self, FilterType};
use rxing::Exceptions;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Something that turns a grayscale image into decoded symbols
///
/// `Ok(vec![])` means the image was processed and nothing was found.
pub trait BarcodeDecoder: Send + Sync {
    fn decode(&self, image: &GrayImage) -> Result<Vec<DecodedBarcode>, DecodeError>;
}

/// Decode and keep only the first symbol
///
/// An empty result is reported as [`DecodeError::Empty`].
pub fn decode_first(
    decoder: &dyn BarcodeDecoder,
    image: &GrayImage,
) -> Result<DecodedBarcode, DecodeError> {
    decoder
        .decode(image)?
        .into_iter()
        .next()
        .ok_or(DecodeError::Empty)
}

/// rqrr + rxing decoder limited to a set of formats
#[derive(Debug, Clone)]
pub struct MultiFormatDecoder {
    formats: Vec<BarcodeFormat>,
    /// Maximum dimension for processing (images are downscaled to this)
    max_dimension: u32,
}

impl MultiFormatDecoder {
    /// Decoder for `formats` with the default size limit
    pub fn new(formats: impl IntoIterator<Item = BarcodeFormat>) -> Self {
        Self::with_max_dimension(formats, decoding::MAX_DECODE_DIMENSION)
    }

    pub fn with_max_dimension(
        formats: impl IntoIterator<Item = BarcodeFormat>,
        max_dimension: u32,
    ) -> Self {
        let mut seen = HashSet::new();
        let formats = formats.into_iter().filter(|f| seen.insert(*f)).collect();
        Self {
            formats,
            max_dimension: max_dimension.max(1),
        }
    }

    /// Enabled formats, in configuration order
    pub fn formats(&self) -> &[BarcodeFormat] {
        &self.formats
    }

    fn wants(&self, format: BarcodeFormat) -> bool {
        self.formats.contains(&format)
    }

    fn wants_rxing(&self) -> bool {
        self.formats.iter().any(|f| *f != BarcodeFormat::QrCode)
    }

    fn decode_qr(&self, image: &GrayImage, out: &mut Vec<DecodedBarcode>) {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            image.width() as usize,
            image.height() as usize,
            |x, y| image.get_pixel(x as u32, y as u32).0[0],
        );

        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((meta, content)) => {
                    trace!(ecc = ?meta.ecc_level, version = ?meta.version, "QR grid decoded");
                    out.push(DecodedBarcode::new(BarcodeFormat::QrCode, content));
                }
                Err(e) => debug!(error = ?e, "QR grid found but not decodable"),
            }
        }
    }

    fn decode_rxing(
        &self,
        image: &GrayImage,
        out: &mut Vec<DecodedBarcode>,
    ) -> Result<(), DecodeError> {
        let results = match rxing::helpers::detect_multiple_in_luma(
            image.as_raw().clone(),
            image.width(),
            image.height(),
        ) {
            Ok(results) => results,
            Err(Exceptions::NotFoundException(_)) => return Ok(()),
            Err(e) => return Err(DecodeError::Failed(e.to_string())),
        };

        for result in results {
            let Some(format) = from_rxing(result.getBarcodeFormat()) else {
                trace!(format = ?result.getBarcodeFormat(), "Unsupported symbology skipped");
                continue;
            };
            if self.wants(format) {
                out.push(DecodedBarcode::new(format, result.getText()));
            }
        }
        Ok(())
    }

    fn downscaled<'a>(&self, image: &'a GrayImage) -> std::borrow::Cow<'a, GrayImage> {
        let (width, height) = image.dimensions();
        let longest = width.max(height);
        if longest <= self.max_dimension {
            return std::borrow::Cow::Borrowed(image);
        }

        let scale = self.max_dimension as f32 / longest as f32;
        let new_width = ((width as f32 * scale).round() as u32).max(1);
        let new_height = ((height as f32 * scale).round() as u32).max(1);
        trace!(width, height, new_width, new_height, "Downscaling for decode");
        std::borrow::Cow::Owned(imageops::resize(
            image,
            new_width,
            new_height,
            FilterType::Triangle,
        ))
    }
}

impl BarcodeDecoder for MultiFormatDecoder {
    fn decode(&self, image: &GrayImage) -> Result<Vec<DecodedBarcode>, DecodeError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::Failed("empty image".to_string()));
        }

        let start = std::time::Instant::now();
        let image = self.downscaled(image);
        let mut found = Vec::new();

        if self.wants(BarcodeFormat::QrCode) {
            self.decode_qr(&image, &mut found);
        }

        // A QR hit from rqrr is enough; rxing would only find it again
        let rxing_result = if self.wants_rxing() || found.is_empty() {
            self.decode_rxing(&image, &mut found)
        } else {
            Ok(())
        };

        // Keep detection order, drop repeated payloads
        let mut seen = HashSet::new();
        found.retain(|barcode| seen.insert(barcode.text.clone()));

        if found.is_empty() {
            rxing_result?;
        } else if let Err(e) = rxing_result {
            debug!(error = %e, "rxing failed after other decoders succeeded");
        }

        if !found.is_empty() {
            debug!(
                count = found.len(),
                first_format = %found[0].format,
                total_ms = start.elapsed().as_millis(),
                "Barcodes decoded"
            );
        }
        Ok(found)
    }
}

fn from_rxing(format: &rxing::BarcodeFormat) -> Option<BarcodeFormat> {
    use rxing::BarcodeFormat as Rx;

    Some(match format {
        Rx::QR_CODE => BarcodeFormat::QrCode,
        Rx::AZTEC => BarcodeFormat::Aztec,
        Rx::DATA_MATRIX => BarcodeFormat::DataMatrix,
        Rx::PDF_417 => BarcodeFormat::Pdf417,
        Rx::EAN_8 => BarcodeFormat::Ean8,
        Rx::EAN_13 => BarcodeFormat::Ean13,
        Rx::UPC_A => BarcodeFormat::UpcA,
        Rx::UPC_E => BarcodeFormat::UpcE,
        Rx::CODE_39 => BarcodeFormat::Code39,
        Rx::CODE_93 => BarcodeFormat::Code93,
        Rx::CODE_128 => BarcodeFormat::Code128,
        Rx::CODABAR => BarcodeFormat::Codabar,
        Rx::ITF => BarcodeFormat::Itf,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use rxing::Writer;

    /// Render `contents` as a black-on-white symbol with a white border
    fn render(contents: &str, format: rxing::BarcodeFormat, width: i32, height: i32) -> GrayImage {
        let matrix = rxing::MultiFormatWriter
            .encode(contents, &format, width, height)
            .unwrap();
        let pad = 20;
        let mut image = GrayImage::from_pixel(
            matrix.getWidth() + 2 * pad,
            matrix.getHeight() + 2 * pad,
            Luma([255]),
        );
        for y in 0..matrix.getHeight() {
            for x in 0..matrix.getWidth() {
                if matrix.get(x, y) {
                    image.put_pixel(x + pad, y + pad, Luma([0]));
                }
            }
        }
        image
    }

    #[test]
    fn test_decodes_linear_stacked_and_qr_symbols() {
        let decoder = MultiFormatDecoder::new(BarcodeFormat::STILL_IMAGE_DEFAULT.iter().copied());
        let cases = [
            ("8412345678905", rxing::BarcodeFormat::EAN_13, BarcodeFormat::Ean13, 400, 120),
            ("PDF417 label 42", rxing::BarcodeFormat::PDF_417, BarcodeFormat::Pdf417, 400, 150),
            ("https://example.org/scan", rxing::BarcodeFormat::QR_CODE, BarcodeFormat::QrCode, 240, 240),
        ];

        for (text, rx_format, format, width, height) in cases {
            let image = render(text, rx_format, width, height);
            let barcode = decode_first(&decoder, &image).unwrap();
            assert_eq!(barcode.text, text);
            assert_eq!(barcode.format, format);
        }
    }

    #[test]
    fn test_decodes_codabar() {
        let decoder = MultiFormatDecoder::new(BarcodeFormat::STILL_IMAGE_DEFAULT.iter().copied());
        let image = render("31117013206375", rxing::BarcodeFormat::CODABAR, 400, 100);

        let barcode = decode_first(&decoder, &image).unwrap();
        assert_eq!(barcode.format, BarcodeFormat::Codabar);
        assert!(barcode.text.contains("31117013206375"));
    }

    #[test]
    fn test_disabled_format_is_filtered_out() {
        let image = render("SCAN-0042", rxing::BarcodeFormat::CODE_128, 400, 100);

        let still = MultiFormatDecoder::new(BarcodeFormat::STILL_IMAGE_DEFAULT.iter().copied());
        assert!(!still.formats().contains(&BarcodeFormat::Code128));
        assert_eq!(still.decode(&image), Ok(Vec::new()));

        let code128 = MultiFormatDecoder::new([BarcodeFormat::Code128]);
        let found = code128.decode(&image).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "SCAN-0042");
        assert_eq!(found[0].format, BarcodeFormat::Code128);
    }

    #[test]
    fn test_blank_image_decodes_to_nothing() {
        let decoder = MultiFormatDecoder::new(BarcodeFormat::ALL);
        let blank = GrayImage::from_pixel(320, 240, Luma([255]));
        assert_eq!(decoder.decode(&blank), Ok(Vec::new()));
        assert_eq!(decode_first(&decoder, &blank), Err(DecodeError::Empty));
    }

    #[test]
    fn test_empty_image_is_failure() {
        let decoder = MultiFormatDecoder::new([BarcodeFormat::QrCode]);
        let empty = GrayImage::new(0, 0);
        assert!(matches!(decoder.decode(&empty), Err(DecodeError::Failed(_))));
    }

    #[test]
    fn test_formats_deduplicated() {
        let decoder = MultiFormatDecoder::new([
            BarcodeFormat::Ean13,
            BarcodeFormat::QrCode,
            BarcodeFormat::Ean13,
        ]);
        assert_eq!(
            decoder.formats(),
            &[BarcodeFormat::Ean13, BarcodeFormat::QrCode]
        );
        assert!(!MultiFormatDecoder::new([BarcodeFormat::QrCode]).wants_rxing());
    }

    #[test]
    fn test_large_image_downscaled() {
        let decoder = MultiFormatDecoder::with_max_dimension([BarcodeFormat::QrCode], 100);
        let image = GrayImage::new(400, 200);
        let scaled = decoder.downscaled(&image);
        assert_eq!(scaled.dimensions(), (100, 50));

        let small = GrayImage::new(80, 60);
        assert!(matches!(
            decoder.downscaled(&small),
            std::borrow::Cow::Borrowed(_)
        ));
    }
}
