use std::sync::Mutex;

use image::ImageFormat;
use leptess::{LepTess, Variable};
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{GleanError, Result};

use super::engine::{OcrEngine, RecognitionLine};
use super::input::CanonicalImage;

/// Tesseract's "automatic page segmentation with orientation and script
/// detection" mode.
const PSM_AUTO_OSD: &str = "1";

/// Map short language codes onto Tesseract traineddata names.
pub fn tesseract_language(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "ch" | "chinese" => "chi_sim".to_string(),
        "chinese_cht" => "chi_tra".to_string(),
        "en" => "eng".to_string(),
        "japan" => "jpn".to_string(),
        "korean" => "kor".to_string(),
        "french" | "fr" => "fra".to_string(),
        "german" | "de" => "deu".to_string(),
        _ => code.to_string(),
    }
}

pub struct TesseractEngine {
    tesseract: Mutex<LepTess>,
}

impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let language = tesseract_language(&config.language);
        let data_path = config
            .tessdata_dir
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());

        let mut lt = LepTess::new(data_path.as_deref(), &language).map_err(|e| {
            GleanError::OcrUnavailable(format!("Tesseract not available for '{language}': {e}"))
        })?;

        if config.angle_classification {
            lt.set_variable(Variable::TesseditPagesegMode, PSM_AUTO_OSD)
                .map_err(|e| GleanError::OcrUnavailable(format!("failed to enable OSD: {e}")))?;
        }

        Ok(Self {
            tesseract: Mutex::new(lt),
        })
    }
}

fn encode_png(image: &CanonicalImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .rgb()
        .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &CanonicalImage) -> Result<Vec<RecognitionLine>> {
        let png = encode_png(image)?;

        let mut lt = self
            .tesseract
            .lock()
            .map_err(|e| GleanError::Ocr(format!("Tesseract lock poisoned: {e}")))?;
        lt.set_image_from_mem(&png)
            .map_err(|e| GleanError::Ocr(format!("Failed to set image: {e}")))?;
        let text = lt
            .get_utf8_text()
            .map_err(|e| GleanError::Ocr(format!("Failed to extract text: {e}")))?;
        let confidence = lt.mean_text_conf().clamp(0, 100) as f32 / 100.0;

        let lines: Vec<RecognitionLine> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| RecognitionLine::new(line, confidence))
            .collect();

        debug!(lines = lines.len(), confidence, "Tesseract recognition complete");
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_mapping() {
        assert_eq!(tesseract_language("ch"), "chi_sim");
        assert_eq!(tesseract_language("chinese_cht"), "chi_tra");
        assert_eq!(tesseract_language("EN"), "eng");
        assert_eq!(tesseract_language("japan"), "jpn");
        assert_eq!(tesseract_language("eng+deu"), "eng+deu");
    }

    #[test]
    fn test_unknown_language_degrades_to_unavailable() {
        let config = OcrConfig {
            resource_dir: std::path::PathBuf::from("/nonexistent"),
            language: "zz_no_such_language".to_string(),
            angle_classification: true,
            tessdata_dir: None,
            max_chars: 4000,
            max_image_dimension: 4096,
        };

        let result = TesseractEngine::new(&config);
        assert!(matches!(result, Err(GleanError::OcrUnavailable(_))));
    }
}
