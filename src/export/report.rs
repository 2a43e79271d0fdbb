/// PDF report generation
///
/// Lays out a project's activity table on A4 pages: a title, then for each
/// record its activity, its description and its photos. Photos that can
/// no longer be found are replaced by a placeholder line.
use image::{imageops::FilterType, DynamicImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use super::metrics::{win_ansi, Font, PT_PER_MM};
use crate::error::{LogError, Result};
use crate::state::data::{Project, Table};

/// A4 portrait, millimetres
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
/// Content never goes below this distance from the bottom edge
const BREAK_MARGIN: f32 = 15.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 12.0;
const LINE_HEIGHT: f32 = 10.0;
const BLOCK_GAP: f32 = 5.0;

/// Displayed photo width; height follows the aspect ratio
const IMAGE_WIDTH: f32 = 80.0;
/// Longest side of the pixels embedded in the PDF
const MAX_EMBED_PIXELS: u32 = 1600;

/// A rendered report
#[derive(Debug, Clone)]
pub struct RenderedReport {
    /// The complete PDF document
    pub bytes: Vec<u8>,
    /// Image references that were replaced by a placeholder
    pub missing_assets: Vec<String>,
    pub page_count: usize,
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Left,
    Center,
}

/// Cursor-based page builder working in millimetres from the top-left corner
struct PageLayout {
    pages: Vec<Vec<Operation>>,
    y: f32,
}

impl PageLayout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: MARGIN,
        }
    }

    /// Start a new page if `height` does not fit above the break margin.
    /// A fresh page always accepts the block.
    fn ensure_room(&mut self, height: f32) {
        let fits = self.y + height <= PAGE_HEIGHT - BREAK_MARGIN;
        if !fits && self.y > MARGIN {
            self.pages.push(Vec::new());
            self.y = MARGIN;
        }
    }

    fn gap(&mut self, height: f32) {
        self.y += height;
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        // `pages` is never empty
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// One line of text vertically centred in a `LINE_HEIGHT` cell
    fn text_line(&mut self, font: Font, size: f32, text: &str, align: Align) {
        self.ensure_room(LINE_HEIGHT);

        let x = match align {
            Align::Left => MARGIN,
            Align::Center => MARGIN + ((CONTENT_WIDTH - font.text_width(text, size)) / 2.0).max(0.0),
        };
        // Baseline sits a bit below the middle of the cell
        let baseline = self.y + LINE_HEIGHT / 2.0 + 0.3 * size / PT_PER_MM;

        let ops = self.ops();
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![font.resource_name().into(), Object::Real(size)],
        ));
        ops.push(Operation::new(
            "Td",
            vec![Object::Real(x * PT_PER_MM), Object::Real((PAGE_HEIGHT - baseline) * PT_PER_MM)],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi(text), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));

        self.y += LINE_HEIGHT;
    }

    /// Wrapped paragraph, one `LINE_HEIGHT` per line
    fn paragraph(&mut self, font: Font, size: f32, text: &str, align: Align) {
        for line in font.wrap(text, size, CONTENT_WIDTH) {
            self.text_line(font, size, &line, align);
        }
    }

    /// Place an image XObject at the left margin
    fn image(&mut self, name: &str, width: f32, height: f32) {
        self.ensure_room(height);

        let bottom = PAGE_HEIGHT - (self.y + height);
        let ops = self.ops();
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![
                Object::Real(width * PT_PER_MM),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(height * PT_PER_MM),
                Object::Real(MARGIN * PT_PER_MM),
                Object::Real(bottom * PT_PER_MM),
            ],
        ));
        ops.push(Operation::new("Do", vec![name.into()]));
        ops.push(Operation::new("Q", vec![]));

        self.y += height;
    }
}

/// Display size in millimetres: fixed width, proportional height.
/// Only an image taller than a whole page is scaled down further.
fn display_size(pixel_width: u32, pixel_height: u32) -> (f32, f32) {
    let ratio = pixel_height as f32 / pixel_width.max(1) as f32;
    let height = IMAGE_WIDTH * ratio;
    let max_height = PAGE_HEIGHT - MARGIN - BREAK_MARGIN;
    if height > max_height {
        (max_height / ratio, max_height)
    } else {
        (IMAGE_WIDTH, height)
    }
}

/// Find and decode the image behind a table reference
fn load_image(project: &Project, reference: &str) -> Result<DynamicImage> {
    let path = project
        .resolve_image(reference)
        .ok_or_else(|| LogError::MissingAsset(reference.to_string()))?;
    Ok(image::open(&path)?)
}

/// Turn decoded pixels into an RGB image XObject
fn image_xobject(img: &DynamicImage) -> Result<Stream> {
    let img = if img.width() > MAX_EMBED_PIXELS || img.height() > MAX_EMBED_PIXELS {
        img.resize(MAX_EMBED_PIXELS, MAX_EMBED_PIXELS, FilterType::Triangle)
    } else {
        img.clone()
    };
    let rgb = img.to_rgb8();

    let mut stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => rgb.width() as i64,
            "Height" => rgb.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    );
    stream.compress()?;
    Ok(stream)
}

/// Render the report for `table` into an in-memory PDF.
///
/// The table is only read. A missing or unreadable photo never fails the
/// report; it shows up as a placeholder and in `missing_assets`.
pub fn render_report(project: &Project, table: &Table) -> Result<RenderedReport> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut layout = PageLayout::new();
    let mut xobjects = Dictionary::new();
    let mut missing_assets = Vec::new();
    let mut image_count = 0;

    layout.paragraph(
        Font::Bold,
        TITLE_SIZE,
        &format!("Project Report: {}", project.name),
        Align::Center,
    );
    layout.gap(LINE_HEIGHT);

    for record in table.iter() {
        layout.paragraph(
            Font::Bold,
            HEADING_SIZE,
            &format!("Activity: {}", record.activity),
            Align::Left,
        );
        layout.paragraph(
            Font::Regular,
            BODY_SIZE,
            &format!("Description: {}", record.description),
            Align::Left,
        );
        layout.gap(BLOCK_GAP);

        for reference in &record.images {
            match load_image(project, reference) {
                Ok(img) => {
                    let (width, height) = display_size(img.width(), img.height());
                    image_count += 1;
                    let name = format!("Im{image_count}");
                    let id = doc.add_object(image_xobject(&img)?);
                    xobjects.set(name.as_bytes().to_vec(), Object::Reference(id));
                    layout.image(&name, width, height);
                }
                Err(e) => {
                    warn!("Report for '{}': {}", project.name, e);
                    missing_assets.push(reference.clone());
                    layout.paragraph(
                        Font::Regular,
                        BODY_SIZE,
                        &format!("Missing image: {}", reference),
                        Align::Left,
                    );
                }
            }
            layout.gap(BLOCK_GAP);
        }
    }

    let mut fonts = Dictionary::new();
    for font in [Font::Regular, Font::Bold] {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name().as_bytes().to_vec(), Object::Reference(font_id));
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
        "XObject" => xobjects,
    });

    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
    for operations in layout.pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    let page_count = kids.len();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH * PT_PER_MM),
                Object::Real(PAGE_HEIGHT * PT_PER_MM),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id: ObjectId = doc.add_object(dictionary! {
        "Title" => Object::String(win_ansi(&format!("Project Report: {}", project.name)), StringFormat::Literal),
        "Producer" => Object::string_literal("bitacora"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;

    Ok(RenderedReport {
        bytes,
        missing_assets,
        page_count,
    })
}

/// Render the report and write it as `Informe_<project>.pdf` in the project folder
pub fn write_report(project: &Project, table: &Table) -> Result<(PathBuf, RenderedReport)> {
    let report = render_report(project, table)?;
    let path = project.report_file();
    fs::write(&path, &report.bytes)?;
    info!(
        "Generated report {} ({} pages, {} missing images)",
        path.display(),
        report.page_count,
        report.missing_assets.len()
    );
    Ok((path, report))
}
