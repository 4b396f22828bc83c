//! Curriculum PDF rendering.
//!
//! Two steps: `layout_pages` places wrapped lines on A4 pages (pure, testable),
//! then `write_pdf` turns them into a `lopdf` document with a double border
//! on every page. CPU-bound; callers run it inside `spawn_blocking`.

use anyhow::{Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::curriculum::models::Curriculum;
use crate::render::font_metrics::HELVETICA;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const TEXT_MARGIN: f32 = 56.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * TEXT_MARGIN;
const BORDER_MARGIN: f32 = 15.0;
const INNER_BORDER_GAP: f32 = 6.0;
const LEADING: f32 = 1.25;

const TITLE_SIZE: f32 = 20.0;
const PHASE_SIZE: f32 = 18.0;
const COURSE_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 11.0;
const SPACER: f32 = 12.0;

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";

/// One line of text at its final position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub size: f32,
    pub bold: bool,
    pub x: f32,
    pub y: f32,
}

pub type PageLayout = Vec<PlacedLine>;

/// Renders `curriculum` under `title` and returns the PDF bytes.
pub fn render_curriculum_pdf(title: &str, curriculum: &Curriculum) -> Result<Vec<u8>> {
    write_pdf(&layout_pages(title, curriculum))
}

/// Places every line of the document, breaking pages as needed.
///
/// Missing descriptions and empty topic lists are skipped.
pub fn layout_pages(title: &str, curriculum: &Curriculum) -> Vec<PageLayout> {
    let mut cursor = PageCursor::new();

    cursor.paragraph(&format!("Curriculum: {title}"), TITLE_SIZE, true);
    cursor.space(SPACER);

    for phase in &curriculum.phases {
        cursor.paragraph(&phase.label, PHASE_SIZE, true);
        if let Some(objective) = phase.objective.as_deref().filter(|o| !o.trim().is_empty()) {
            cursor.paragraph(&format!("Objective: {objective}"), BODY_SIZE, false);
        }
        cursor.space(SPACER);

        for course in &phase.courses {
            cursor.paragraph(&course.course_title, COURSE_SIZE, true);
            if !course.course_description.trim().is_empty() {
                cursor.paragraph(&course.course_description, BODY_SIZE, false);
            }
            if !course.topics.is_empty() {
                cursor.paragraph(
                    &format!("Key topics: {}", course.topics.join(", ")),
                    BODY_SIZE,
                    false,
                );
            }
            cursor.space(SPACER);
        }
    }

    cursor.finish()
}

struct PageCursor {
    pages: Vec<PageLayout>,
    current: PageLayout,
    y: f32,
}

impl PageCursor {
    fn new() -> Self {
        PageCursor {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - TEXT_MARGIN,
        }
    }

    fn paragraph(&mut self, text: &str, size: f32, bold: bool) {
        for line in HELVETICA.wrap(text, size, bold, CONTENT_WIDTH) {
            self.line(line, size, bold);
        }
    }

    fn line(&mut self, text: String, size: f32, bold: bool) {
        let advance = size * LEADING;
        if self.y - advance < TEXT_MARGIN {
            self.break_page();
        }
        self.y -= advance;
        self.current.push(PlacedLine {
            text,
            size,
            bold,
            x: TEXT_MARGIN,
            y: self.y,
        });
    }

    fn space(&mut self, points: f32) {
        self.y -= points;
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - TEXT_MARGIN;
    }

    fn finish(mut self) -> Vec<PageLayout> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Serializes laid-out pages with the standard Helvetica fonts.
pub fn write_pdf(pages: &[PageLayout]) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR_FONT => regular_id,
            BOLD_FONT => bold_id,
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page_operations(page),
        };
        let encoded = content.encode().context("Failed to encode page content")?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(page_count),
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH),
                Object::Real(PAGE_HEIGHT),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).context("Failed to write PDF")?;
    Ok(bytes)
}

fn page_operations(page: &[PlacedLine]) -> Vec<Operation> {
    let mut operations = border_operations();
    for line in page {
        let font = if line.bold { BOLD_FONT } else { REGULAR_FONT };
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font.as_bytes().to_vec()), Object::Real(line.size)],
            ),
            Operation::new("Td", vec![Object::Real(line.x), Object::Real(line.y)]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(&line.text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }
    operations
}

/// Outer 2pt frame and inner 1pt frame.
fn border_operations() -> Vec<Operation> {
    let frame = |width: f32, inset: f32| {
        [
            Operation::new("w", vec![Object::Real(width)]),
            Operation::new(
                "re",
                vec![
                    Object::Real(inset),
                    Object::Real(inset),
                    Object::Real(PAGE_WIDTH - 2.0 * inset),
                    Object::Real(PAGE_HEIGHT - 2.0 * inset),
                ],
            ),
            Operation::new("S", vec![]),
        ]
    };
    let mut operations = Vec::with_capacity(6);
    operations.extend(frame(2.0, BORDER_MARGIN));
    operations.extend(frame(1.0, BORDER_MARGIN + INNER_BORDER_GAP));
    operations
}

/// Maps text to WinAnsi bytes; unmappable characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        })
        .collect()
}
