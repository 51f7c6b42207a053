use crate::domain::models::{RawMetadata, ResolutionUnit};
use exif::{Exif, In, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Reads camera metadata from an image. Any failure means "no data".
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, image: &Path) -> Option<RawMetadata>;
}

/// EXIF reader with a header-decoding fallback for pixel dimensions.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifMetadataExtractor;

impl MetadataExtractor for ExifMetadataExtractor {
    fn extract(&self, image: &Path) -> Option<RawMetadata> {
        let mut meta = match read_exif(image) {
            Some(exif) => from_exif(&exif),
            None => RawMetadata::default(),
        };

        if meta.image_width_px.is_none() || meta.image_height_px.is_none() {
            match image::image_dimensions(image) {
                Ok((w, h)) => {
                    meta.image_width_px = Some(w);
                    meta.image_height_px = Some(h);
                }
                Err(e) => tracing::debug!(path = %image.display(), "no image dimensions: {e}"),
            }
        }

        if meta.is_empty() {
            None
        } else {
            Some(meta)
        }
    }
}

fn read_exif(path: &Path) -> Option<Exif> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Some(exif),
        Err(e) => {
            tracing::debug!(path = %path.display(), "no exif: {e}");
            None
        }
    }
}

fn from_exif(exif: &Exif) -> RawMetadata {
    let value = |tag: Tag| exif.get_field(tag, In::PRIMARY).map(|f| &f.value);

    RawMetadata {
        make: value(Tag::Make).and_then(ascii_string),
        model: value(Tag::Model).and_then(ascii_string),
        focal_length_mm: value(Tag::FocalLength).and_then(real),
        focal_length_35mm: value(Tag::FocalLengthIn35mmFilm).and_then(real),
        focal_plane_x_resolution: value(Tag::FocalPlaneXResolution).and_then(real),
        focal_plane_y_resolution: value(Tag::FocalPlaneYResolution).and_then(real),
        focal_plane_resolution_unit: value(Tag::FocalPlaneResolutionUnit)
            .and_then(|v| v.get_uint(0))
            .and_then(ResolutionUnit::from_exif_code),
        image_width_px: value(Tag::PixelXDimension)
            .or_else(|| value(Tag::ImageWidth))
            .and_then(|v| v.get_uint(0)),
        image_height_px: value(Tag::PixelYDimension)
            .or_else(|| value(Tag::ImageLength))
            .and_then(|v| v.get_uint(0)),
    }
}

fn ascii_string(v: &Value) -> Option<String> {
    let Value::Ascii(parts) = v else {
        return None;
    };
    let raw = parts.first()?;
    let s = String::from_utf8_lossy(raw)
        .trim_end_matches('\0')
        .trim()
        .to_string();
    (!s.is_empty()).then_some(s)
}

fn real(v: &Value) -> Option<f64> {
    let out = match v {
        Value::Rational(r) => r.first().filter(|r| r.denom != 0).map(|r| r.to_f64()),
        Value::SRational(r) => r.first().filter(|r| r.denom != 0).map(|r| r.to_f64()),
        Value::Float(f) => f.first().map(|x| f64::from(*x)),
        Value::Double(d) => d.first().copied(),
        other => other.get_uint(0).map(f64::from),
    };
    out.filter(|x| x.is_finite() && *x > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::Rational;

    #[test]
    fn ascii_values_are_trimmed() {
        let v = Value::Ascii(vec![b"Apple\0".to_vec()]);
        assert_eq!(ascii_string(&v).as_deref(), Some("Apple"));
        assert_eq!(ascii_string(&Value::Ascii(vec![b"  \0".to_vec()])), None);
    }

    #[test]
    fn rationals_and_shorts_become_reals() {
        let focal = Value::Rational(vec![Rational { num: 57, denom: 10 }]);
        assert_eq!(real(&focal), Some(5.7));
        assert_eq!(real(&Value::Short(vec![26])), Some(26.0));
        assert_eq!(real(&Value::Rational(vec![Rational { num: 1, denom: 0 }])), None);
    }

    #[test]
    fn missing_file_yields_nothing() {
        assert!(ExifMetadataExtractor
            .extract(Path::new("/nonexistent/horizon.jpg"))
            .is_none());
    }

    #[test]
    fn falls_back_to_decoded_dimensions() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("plain.png");
        image::RgbImage::new(64, 48).save(&path).expect("write png");
        let meta = ExifMetadataExtractor.extract(&path).expect("dimensions");
        assert_eq!(meta.image_width_px, Some(64));
        assert_eq!(meta.image_height_px, Some(48));
        assert!(meta.make.is_none());
    }
}
