//! OCR via the Tesseract command-line engine.
//!
//! Each page image is piped to `tesseract stdin stdout` as PNG and the
//! recognised text is read back from stdout. Loading the engine means
//! locating the binary and reading its version and installed languages;
//! every run then checks its own language against that list before the
//! first page, so a missing language fails as a load error.
//!
//! The CLI gives no intermediate progress, so a page reports `0.0` when the
//! child starts and `1.0` when it exits successfully.

use super::{EngineKind, Recognition, RecognitionProgress, RecognizeOptions, Recognizer};
use crate::config::OcrConfig;
use crate::error::StageError;
use crate::pipeline::encode::PageImage;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^tesseract\s+v?(\d+\.\d+(?:\.\d+)?)").unwrap());

/// Form feed tesseract appends after every page.
const PAGE_SEPARATOR: char = '\u{c}';

/// Where tesseract runs from: the binary and its language data directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TesseractLocation {
    pub binary: PathBuf,
    pub tessdata_dir: Option<PathBuf>,
}

impl TesseractLocation {
    /// Binary resolution order: `config.tesseract_path`, `TESSERACT_PATH`,
    /// `tesseract` on `PATH`.
    pub fn locate(config: &OcrConfig) -> Self {
        let binary = config
            .tesseract_path
            .clone()
            .or_else(|| std::env::var_os("TESSERACT_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("tesseract"));
        Self {
            binary,
            tessdata_dir: config.tessdata_dir.clone(),
        }
    }
}

/// A located and verified tesseract install.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    location: TesseractLocation,
    version: String,
    languages: Vec<String>,
}

impl TesseractRecognizer {
    /// Probe the install at `location` for its version and language list.
    pub async fn load(location: TesseractLocation) -> Result<Self, StageError> {
        let binary = &location.binary;
        let version_out = run_probe(binary, &[OsString::from("--version")]).await?;
        let version = parse_version(&version_out).ok_or_else(|| {
            load_error(format!(
                "'{}' did not report a tesseract version",
                binary.display()
            ))
        })?;
        debug!("found tesseract {} at {}", version, binary.display());

        let mut list_args = vec![OsString::from("--list-langs")];
        if let Some(ref dir) = location.tessdata_dir {
            list_args.push("--tessdata-dir".into());
            list_args.push(dir.as_os_str().to_owned());
        }
        let languages = parse_languages(&run_probe(binary, &list_args).await?);

        Ok(Self {
            location,
            version,
            languages,
        })
    }

    /// Fail with a load error unless every code in `language` is installed.
    pub fn require_languages(&self, language: &str) -> Result<(), StageError> {
        let missing = missing_languages(language, &self.languages);
        if missing.is_empty() {
            return Ok(());
        }
        Err(load_error(format!(
            "language data not installed: {} (available: {})",
            missing.join(", "),
            self.languages.join(", ")
        )))
    }

    /// Version string reported by `tesseract --version`, e.g. "5.3.0".
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Installed language codes.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    fn ocr_args(&self, options: &RecognizeOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["stdin".into(), "stdout".into()];
        args.push("-l".into());
        args.push(options.language.as_str().into());
        if let Some(psm) = options.psm {
            args.push("--psm".into());
            args.push(psm.to_string().into());
        }
        if let Some(ref dir) = self.location.tessdata_dir {
            args.push("--tessdata-dir".into());
            args.push(dir.as_os_str().to_owned());
        }
        args
    }
}

#[async_trait]
impl Recognizer for TesseractRecognizer {
    async fn recognize(
        &self,
        page: usize,
        image: PageImage,
        options: &RecognizeOptions,
        progress: RecognitionProgress<'_>,
    ) -> Result<Recognition, StageError> {
        let fail = |detail: String| StageError::Recognition { page, detail };
        let binary = &self.location.binary;

        progress(0.0);

        let mut child = Command::new(binary)
            .args(self.ocr_args(options))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| fail(format!("could not start '{}': {e}", binary.display())))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| fail("tesseract stdin unavailable".into()))?;
        let png = image.into_bytes();
        let write = async move {
            let result = stdin.write_all(&png).await;
            drop(stdin);
            result
        };

        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.map_err(|e| fail(format!("tesseract did not finish: {e}")))?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(fail(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        written.map_err(|e| fail(format!("could not send page image: {e}")))?;

        if !stderr.trim().is_empty() {
            debug!("tesseract page {}: {}", page, stderr.trim());
        }

        let text = strip_page_separator(&String::from_utf8_lossy(&output.stdout)).to_string();
        if text.trim().is_empty() {
            warn!("Page {}: no text recognised", page);
        }

        progress(1.0);
        Ok(Recognition {
            text,
            confidence: None,
        })
    }
}

async fn run_probe(binary: &Path, args: &[OsString]) -> Result<String, StageError> {
    let output = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| load_error(format!("could not run '{}': {e}", binary.display())))?;

    if !output.status.success() {
        return Err(load_error(format!(
            "'{}' exited with {}: {}",
            binary.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    // Older releases print the version banner to stderr.
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push('\n');
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(text)
}

fn load_error(reason: String) -> StageError {
    StageError::EngineLoad {
        engine: EngineKind::OcrEngine,
        reason,
    }
}

fn parse_version(output: &str) -> Option<String> {
    VERSION_RE
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse `--list-langs` output: a header line followed by one code per line.
fn parse_languages(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("List of available languages"))
        .filter(|l| l.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .map(str::to_string)
        .collect()
}

/// Components of a `+`-joined language list that are not installed.
fn missing_languages(requested: &str, installed: &[String]) -> Vec<String> {
    requested
        .split('+')
        .filter(|code| !installed.iter().any(|l| l == code))
        .map(str::to_string)
        .collect()
}

fn strip_page_separator(text: &str) -> &str {
    text.strip_suffix(PAGE_SEPARATOR).unwrap_or(text)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::encode_page;
    use crate::pipeline::raster::RasterSurface;

    #[test]
    fn parses_modern_and_legacy_version_banners() {
        assert_eq!(
            parse_version("tesseract 5.3.0\n leptonica-1.82.0\n").as_deref(),
            Some("5.3.0")
        );
        assert_eq!(
            parse_version("\ntesseract v4.1.1-rc2-22-g08899\n").as_deref(),
            Some("4.1.1")
        );
        assert_eq!(parse_version("command not found"), None);
    }

    #[test]
    fn parses_language_list() {
        let out = "List of available languages in \"/usr/share/tesseract-ocr/5/tessdata/\" (3):\n\
                   eng\nosd\nchi_sim\n";
        assert_eq!(parse_languages(out), vec!["eng", "osd", "chi_sim"]);
    }

    #[test]
    fn reports_each_missing_language() {
        let installed = vec!["eng".to_string(), "osd".to_string()];
        assert!(missing_languages("eng", &installed).is_empty());
        assert_eq!(missing_languages("eng+fra+deu", &installed), vec!["fra", "deu"]);
    }

    #[test]
    fn strips_only_trailing_form_feed() {
        assert_eq!(strip_page_separator("Take 1 tablet\n\u{c}"), "Take 1 tablet\n");
        assert_eq!(strip_page_separator("a\u{c}b"), "a\u{c}b");
    }

    fn engine_at(binary: PathBuf, tessdata_dir: Option<PathBuf>) -> TesseractRecognizer {
        TesseractRecognizer {
            location: TesseractLocation {
                binary,
                tessdata_dir,
            },
            version: "5.3.0".into(),
            languages: vec!["eng".into(), "osd".into()],
        }
    }

    #[test]
    fn ocr_args_include_optional_flags() {
        let engine = engine_at("tesseract".into(), Some("/opt/tessdata".into()));
        let options = RecognizeOptions {
            language: "eng".into(),
            psm: Some(6),
        };
        let args: Vec<String> = engine
            .ocr_args(&options)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["stdin", "stdout", "-l", "eng", "--psm", "6", "--tessdata-dir", "/opt/tessdata"]
        );
    }

    #[test]
    fn required_language_must_be_installed() {
        let engine = engine_at("tesseract".into(), None);
        assert!(engine.require_languages("eng+osd").is_ok());
        match engine.require_languages("eng+fra") {
            Err(StageError::EngineLoad { engine, reason }) => {
                assert_eq!(engine, EngineKind::OcrEngine);
                assert!(reason.contains("fra"), "got: {reason}");
            }
            other => panic!("expected a load error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_load_error() {
        let location = TesseractLocation {
            binary: "/nonexistent/bin/tesseract".into(),
            tessdata_dir: None,
        };
        let err = TesseractRecognizer::load(location).await.unwrap_err();
        assert!(matches!(
            err,
            StageError::EngineLoad {
                engine: EngineKind::OcrEngine,
                ..
            }
        ));
    }

    fn page_image() -> PageImage {
        let mut surface = RasterSurface::new();
        surface.fill_rgba(4, 4, &[0u8; 64]);
        encode_page(&surface).unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn load_probes_version_and_languages() {
        let dir = tempfile::tempdir().unwrap();
        let location = TesseractLocation {
            binary: fake::install(dir.path(), fake::RECOGNISES),
            tessdata_dir: Some("/opt/tessdata".into()),
        };

        let engine = TesseractRecognizer::load(location).await.unwrap();

        assert_eq!(engine.version(), "5.3.0");
        assert_eq!(engine.languages(), &["eng".to_string(), "osd".to_string()]);
        assert_eq!(
            fake::probes(dir.path()),
            vec!["version", "list-langs --list-langs --tessdata-dir /opt/tessdata"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn recognize_pipes_png_and_strips_form_feed() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake::install(dir.path(), fake::RECOGNISES);
        let engine = engine_at(binary, Some("/opt/tessdata".into()));
        let options = RecognizeOptions {
            language: "eng".into(),
            psm: Some(6),
        };
        let image = page_image();
        let png = image.as_bytes().to_vec();

        let seen = std::sync::Mutex::new(Vec::new());
        let on_progress = |f: f32| seen.lock().unwrap().push(f);
        let out = engine.recognize(1, image, &options, &on_progress).await.unwrap();

        assert_eq!(
            out.text,
            "ARGS:stdin stdout -l eng --psm 6 --tessdata-dir /opt/tessdata\n\
             Take 1 tablet twice daily\n"
        );
        assert_eq!(out.confidence, None);
        assert_eq!(*seen.lock().unwrap(), vec![0.0, 1.0]);
        assert_eq!(std::fs::read(dir.path().join("stdin.bin")).unwrap(), png);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_exit_is_a_recognition_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_at(fake::install(dir.path(), fake::REJECTS_IMAGE), None);
        let options = RecognizeOptions {
            language: "eng".into(),
            psm: None,
        };

        let seen = std::sync::Mutex::new(Vec::new());
        let on_progress = |f: f32| seen.lock().unwrap().push(f);
        let err = engine
            .recognize(2, page_image(), &options, &on_progress)
            .await
            .unwrap_err();

        match err {
            StageError::Recognition { page, detail } => {
                assert_eq!(page, 2);
                assert!(detail.contains("Unknown format"), "got: {detail}");
            }
            other => panic!("expected a recognition error, got {other:?}"),
        }
        assert_eq!(*seen.lock().unwrap(), vec![0.0]);
    }
}
