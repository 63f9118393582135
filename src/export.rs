//! Artifact export: PNG, SVG and a single-page PDF.
//!
//! The PDF writer is deliberately small: one A4 page, Helvetica text from
//! the standard 14 fonts and one Flate-compressed RGB image. Layout is in
//! millimetres measured from the top of the page, converted to PDF points
//! (origin bottom-left) at write time.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::ValueEnum;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use thiserror::Error;
use tracing::info;

use crate::render::{RenderError, Rendered};

/// Default file stem for exported codes.
pub const DEFAULT_STEM: &str = "qrcode";

const MM_TO_PT: f32 = 72.0 / 25.4;
const A4_WIDTH_MM: f32 = 210.0;
const A4_HEIGHT_MM: f32 = 297.0;
const PDF_IMAGE_MM: f32 = 80.0;
const PDF_TEXT_LIMIT: usize = 50;
const PDF_FOOTER: &str = "Generated with QRgo";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing has been rendered yet")]
    NothingRendered,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot infer export format from '{0}' (use .png, .svg or .pdf)")]
    UnknownFormat(String),

    #[error("Failed to compress PDF image data: {0}")]
    Compress(#[source] std::io::Error),
}

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ExportFormat {
    Png,
    Svg,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }

    /// Default download name, e.g. `qrcode.png`.
    pub fn default_filename(self) -> String {
        format!("{DEFAULT_STEM}.{}", self.extension())
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            _ => Err(ExportError::UnknownFormat(path.display().to_string())),
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encode `rendered` in `format`.
pub fn export_bytes(rendered: &Rendered, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Png => Ok(rendered.to_png()?),
        ExportFormat::Svg => Ok(rendered.to_svg().into_bytes()),
        ExportFormat::Pdf => render_pdf(rendered),
    }
}

/// Encode `rendered` in `format` and write it to `path`.
pub fn export_to_file(
    rendered: &Rendered,
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    let bytes = export_bytes(rendered, format)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, &bytes).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), %format, bytes = bytes.len(), "exported code");
    Ok(())
}

/// File name for a history export made on `date`.
pub fn history_export_filename(date: NaiveDate) -> String {
    format!("qr-history-{}.json", date.format("%Y-%m-%d"))
}

/// File name for a history export made today (local time).
pub fn history_export_filename_today() -> String {
    history_export_filename(chrono::Local::now().date_naive())
}

/// Payload text as shown under the code in the PDF.
pub fn pdf_caption(content: &str) -> String {
    if content.chars().count() > PDF_TEXT_LIMIT {
        let head: String = content.chars().take(PDF_TEXT_LIMIT).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

fn text_width_pt(text: &str, font_size: f32) -> f32 {
    let units: u32 = text
        .bytes()
        .map(|b| match b {
            32..=126 => HELVETICA_WIDTHS[(b - 32) as usize] as u32,
            _ => 556,
        })
        .sum();
    units as f32 * font_size / 1000.0
}

/// Restrict to printable ASCII and escape PDF string delimiters.
fn pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

struct TextRun<'a> {
    font: &'a str,
    size: f32,
    gray: f32,
    /// Baseline, millimetres from the top edge.
    y_mm: f32,
    text: String,
}

fn centered_text_op(run: &TextRun<'_>) -> String {
    let page_w = A4_WIDTH_MM * MM_TO_PT;
    let page_h = A4_HEIGHT_MM * MM_TO_PT;
    let x = (page_w - text_width_pt(&run.text, run.size)) / 2.0;
    let y = page_h - run.y_mm * MM_TO_PT;
    format!(
        "BT /{} {:.1} Tf {:.3} g {:.2} {:.2} Td ({}) Tj ET\n",
        run.font,
        run.size,
        run.gray,
        x,
        y,
        pdf_text(&run.text)
    )
}

/// Build the single-page PDF for `rendered`.
pub fn render_pdf(rendered: &Rendered) -> Result<Vec<u8>, ExportError> {
    let page_w = A4_WIDTH_MM * MM_TO_PT;
    let page_h = A4_HEIGHT_MM * MM_TO_PT;

    let img_x_mm = (A4_WIDTH_MM - PDF_IMAGE_MM) / 2.0;
    let img_top_mm = (A4_HEIGHT_MM - PDF_IMAGE_MM) / 2.0 - 20.0;

    // Flatten onto white; PDF image XObjects here carry no alpha.
    let image = rendered.image();
    let (w, h) = image.dimensions();
    let mut rgb = Vec::with_capacity((w * h * 3) as usize);
    for px in image.pixels() {
        let [r, g, b, a] = px.0;
        let blend = |c: u8| ((c as u32 * a as u32 + 255 * (255 - a as u32)) / 255) as u8;
        rgb.extend_from_slice(&[blend(r), blend(g), blend(b)]);
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&rgb).map_err(ExportError::Compress)?;
    let image_stream = encoder.finish().map_err(ExportError::Compress)?;

    let mut content = String::new();
    content.push_str(&centered_text_op(&TextRun {
        font: "F2",
        size: 24.0,
        gray: 0.0,
        y_mm: 30.0,
        text: "QR Code".to_string(),
    }));
    content.push_str(&format!(
        "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /Im1 Do Q\n",
        PDF_IMAGE_MM * MM_TO_PT,
        PDF_IMAGE_MM * MM_TO_PT,
        img_x_mm * MM_TO_PT,
        page_h - (img_top_mm + PDF_IMAGE_MM) * MM_TO_PT
    ));
    content.push_str(&centered_text_op(&TextRun {
        font: "F1",
        size: 10.0,
        gray: 0.0,
        y_mm: img_top_mm + PDF_IMAGE_MM + 15.0,
        text: pdf_caption(rendered.data()),
    }));
    content.push_str(&centered_text_op(&TextRun {
        font: "F1",
        size: 8.0,
        gray: 150.0 / 255.0,
        y_mm: A4_HEIGHT_MM - 20.0,
        text: PDF_FOOTER.to_string(),
    }));

    let mut pdf = PdfWriter::new();
    pdf.object(b"<< /Type /Catalog /Pages 2 0 R >>");
    pdf.object(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    pdf.object(
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Resources << /Font << /F1 4 0 R /F2 5 0 R >> /XObject << /Im1 6 0 R >> >> \
             /Contents 7 0 R >>",
            page_w, page_h
        )
        .as_bytes(),
    );
    pdf.object(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );
    pdf.object(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
    );
    pdf.stream(
        &format!(
            "<< /Type /XObject /Subtype /Image /Width {w} /Height {h} /ColorSpace /DeviceRGB \
             /BitsPerComponent 8 /Filter /FlateDecode /Length {} >>",
            image_stream.len()
        ),
        &image_stream,
    );
    pdf.stream(
        &format!("<< /Length {} >>", content.len()),
        content.as_bytes(),
    );
    Ok(pdf.finish(1))
}

/// Sequential object writer tracking xref offsets.
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    fn begin(&mut self) {
        self.offsets.push(self.buf.len());
        let header = format!("{} 0 obj\n", self.offsets.len());
        self.buf.extend_from_slice(header.as_bytes());
    }

    fn object(&mut self, body: &[u8]) {
        self.begin();
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, dict: &str, data: &[u8]) {
        self.begin();
        self.buf.extend_from_slice(dict.as_bytes());
        self.buf.extend_from_slice(b"\nstream\n");
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self, root: usize) -> Vec<u8> {
        let xref_at = self.buf.len();
        let count = self.offsets.len() + 1;
        let mut xref = format!("xref\n0 {count}\n0000000000 65535 f \n");
        for offset in &self.offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {count} /Root {root} 0 R >>\nstartxref\n{xref_at}\n%%EOF\n"
        ));
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}
