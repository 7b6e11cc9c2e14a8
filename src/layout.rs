//! Layout engine – flows a [`RenderDocument`] top to bottom onto fixed-size
//! pages and produces the positioned boxes of a [`LayoutConfig`].
//!
//! Sections are stacked in a fixed order with fixed gaps. A block that does
//! not fit the space left on the page moves to a new page; the items table
//! and the notes continue row by row and line by line instead.

use log::debug;

use crate::document::{ItemsTable, RenderDocument};
use crate::fonts::{wrap_text, FontManager};
use crate::layout_config::{
    BorderSides, BorderStyle, ImageContent, LayoutBox, LayoutConfig, PageLayout, TextContent,
    TextLine,
};
use crate::options::PageGeometry;
use crate::style::{Color, FontWeight, TextAlign, TextStyle};

const CM: f32 = 72.0 / 2.54;

/// Share of the content width taken by the left column of the header and
/// info sections.
const LEFT_COLUMN: f32 = 0.55;
const HEADER_GAP: f32 = 20.0;
const INFO_GAP: f32 = 20.0;
const ITEMS_GAP: f32 = 15.0;
const TOTALS_GAP: f32 = 25.0;
const NOTES_TRAILING_GAP: f32 = 20.0;
const FOOTER_GAP: f32 = 10.0;

const LOGO_HEIGHT: f32 = 2.5 * CM;
const LOGO_GAP: f32 = 8.0;
const TITLE_GAP: f32 = 4.0;
const NOTES_LABEL_GAP: f32 = 4.0;

const META_COLUMNS: [f32; 2] = [3.5 * CM, 3.0 * CM];
const META_PADDING: f32 = 1.0;

const ITEM_COLUMNS: [f32; 4] = [0.50, 0.16, 0.17, 0.17];
const ITEM_HEADER_PADDING: f32 = 10.0;
const ITEM_ROW_PADDING: f32 = 8.0;
const CELL_PADDING: f32 = 6.0;
const EDGE_CELL_PADDING: f32 = 12.0;
const ROW_RULE_WIDTH: f32 = 0.5;

const TOTALS_LABEL_COLUMN: f32 = 0.70;
const TOTALS_RIGHT_PADDING: f32 = 12.0;
const TOTALS_ROW_PADDING: f32 = 4.0;
const TOTAL_ROW_PADDING: f32 = 8.0;
const TOTAL_RULE_WIDTH: f32 = 1.0;

/// Tolerance for float accumulation when checking whether a block fits.
const FIT_EPSILON: f32 = 0.01;

/// Lay out the whole invoice.
pub fn compute_layout(doc: &RenderDocument, page: &PageGeometry, fonts: &FontManager) -> LayoutConfig {
    let mut flow = Flow::new(page);

    flow.place(header_block(doc, page, fonts));
    flow.gap(HEADER_GAP);
    flow.place(info_block(doc, page, fonts));
    flow.gap(INFO_GAP);
    flow_items(&mut flow, &doc.items, doc.accent, page, fonts);
    flow.gap(ITEMS_GAP);
    flow.place(totals_block(doc, page, fonts));
    flow.gap(TOTALS_GAP);
    if let Some(notes) = &doc.notes {
        flow_notes(&mut flow, notes, page, fonts);
        flow.gap(NOTES_TRAILING_GAP);
    }
    flow.gap(FOOTER_GAP);
    let mut footer = Stack::default();
    footer.paragraph(
        fonts,
        &doc.footer,
        &TextStyle::footer_note(),
        page.margin_left,
        page.content_width(),
    );
    flow.place(footer);

    let mut config = LayoutConfig::new(doc.title.clone(), page);
    config.pages = flow.finish();
    debug!("laid out {} into {} page(s)", doc.title, config.pages.len());
    config
}

// ---------------------------------------------------------------------------
// Vertical flow across pages
// ---------------------------------------------------------------------------

struct Flow<'a> {
    page: &'a PageGeometry,
    pages: Vec<PageLayout>,
    current: PageLayout,
    /// Next free y on the current page, from the page top.
    y: f32,
}

impl<'a> Flow<'a> {
    fn new(page: &'a PageGeometry) -> Self {
        Self {
            page,
            pages: Vec::new(),
            current: PageLayout::new(0),
            y: page.margin_top,
        }
    }

    fn at_page_top(&self) -> bool {
        self.current.boxes.is_empty()
    }

    fn remaining(&self) -> f32 {
        self.page.content_bottom() - self.y
    }

    fn break_page(&mut self) {
        let next = PageLayout::new(self.pages.len() + 1);
        self.pages.push(std::mem::replace(&mut self.current, next));
        self.y = self.page.margin_top;
    }

    /// Start a new page unless `height` fits below the cursor. A block taller
    /// than a whole page is placed at the top of a page and overflows it.
    fn ensure(&mut self, height: f32) {
        if height > self.remaining() + FIT_EPSILON && !self.at_page_top() {
            self.break_page();
        }
    }

    /// Vertical space between blocks; swallowed at the top of a page.
    fn gap(&mut self, height: f32) {
        if !self.at_page_top() {
            self.y += height;
        }
    }

    /// Place a block that must stay on one page.
    fn place(&mut self, stack: Stack) {
        self.ensure(stack.height);
        for mut lbox in stack.boxes {
            shift(&mut lbox, self.y);
            self.current.boxes.push(lbox);
        }
        self.y += stack.height;
    }

    /// Place a single box whose y is relative to the cursor.
    fn place_box(&mut self, mut lbox: LayoutBox) {
        let height = lbox.height;
        self.ensure(height);
        shift(&mut lbox, self.y);
        self.current.boxes.push(lbox);
        self.y += height;
    }

    fn finish(mut self) -> Vec<PageLayout> {
        if !self.current.boxes.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

fn shift(lbox: &mut LayoutBox, dy: f32) {
    lbox.y += dy;
    for child in &mut lbox.children {
        shift(child, dy);
    }
}

/// Boxes stacked downwards from y = 0, positioned later by [`Flow`].
#[derive(Default)]
struct Stack {
    boxes: Vec<LayoutBox>,
    height: f32,
}

impl Stack {
    fn paragraph(&mut self, fonts: &FontManager, text: &str, style: &TextStyle, x: f32, width: f32) {
        let lbox = text_box(fonts, text, style, x, self.height, width);
        self.height += lbox.height + style.space_after;
        self.boxes.push(lbox);
    }

    fn space(&mut self, height: f32) {
        self.height += height;
    }

    fn push(&mut self, lbox: LayoutBox) {
        self.height = self.height.max(lbox.bottom());
        self.boxes.push(lbox);
    }

    /// Merge two top-aligned columns.
    fn beside(mut self, other: Stack) -> Stack {
        self.height = self.height.max(other.height);
        self.boxes.extend(other.boxes);
        self
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// A wrapped, aligned paragraph at (`x`, `y`) no wider than `width`.
fn text_box(fonts: &FontManager, text: &str, style: &TextStyle, x: f32, y: f32, width: f32) -> LayoutBox {
    let size = style.font_size;
    let first_baseline = (style.leading + fonts.ascender(size) + fonts.descender(size)) / 2.0;

    let lines: Vec<TextLine> = wrap_text(text, size, style.weight, width, fonts)
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let line_width = fonts.measure_text_width(&line, size, style.weight);
            let x_offset = match style.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => ((width - line_width) / 2.0).max(0.0),
                TextAlign::Right => (width - line_width).max(0.0),
            };
            TextLine {
                text: line,
                x_offset,
                baseline: first_baseline + i as f32 * style.leading,
            }
        })
        .collect();

    let mut lbox = LayoutBox::new(x, y, width, lines.len() as f32 * style.leading);
    lbox.text = Some(TextContent {
        lines,
        font_family: fonts.family_for(style.weight).to_string(),
        font_size: size,
        bold: style.weight == FontWeight::Bold,
        color: style.color.to_array(),
        line_height: style.leading,
        text_align: style.align,
    });
    lbox
}

/// Split a paragraph box into one box per line so it can flow across pages.
fn split_lines(lbox: LayoutBox) -> Vec<LayoutBox> {
    let Some(text) = lbox.text else {
        return Vec::new();
    };
    let leading = text.line_height;
    text.lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let top = i as f32 * leading;
            let mut line_box = LayoutBox::new(lbox.x, 0.0, lbox.width, leading);
            line_box.text = Some(TextContent {
                lines: vec![TextLine {
                    baseline: line.baseline - top,
                    ..line.clone()
                }],
                ..text.clone()
            });
            line_box
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn header_block(doc: &RenderDocument, page: &PageGeometry, fonts: &FontManager) -> Stack {
    let left_x = page.margin_left;
    let left_w = page.content_width() * LEFT_COLUMN;
    let right_x = left_x + left_w;
    let right_w = page.content_width() - left_w;

    let mut left = Stack::default();
    if let Some(logo) = &doc.header.logo {
        let mut height = LOGO_HEIGHT;
        let mut width = height * logo.aspect_ratio();
        if width > left_w {
            height *= left_w / width;
            width = left_w;
        }
        let mut lbox = LayoutBox::new(left_x, 0.0, width, height);
        lbox.image = Some(ImageContent {
            src: logo.path.to_string_lossy().into_owned(),
            width,
            height,
        });
        left.push(lbox);
        left.space(LOGO_GAP);
    }
    left.paragraph(
        fonts,
        &doc.header.company_name,
        &TextStyle::company_name(doc.accent),
        left_x,
        left_w,
    );
    left.space(TITLE_GAP);
    left.paragraph(
        fonts,
        &doc.header.title,
        &TextStyle::invoice_title(doc.accent),
        left_x,
        left_w,
    );

    let mut right = Stack::default();
    for line in &doc.contact {
        let style = if line.emphasis {
            TextStyle::company_info().with_weight(FontWeight::Bold)
        } else {
            TextStyle::company_info()
        };
        right.paragraph(fonts, &line.text, &style, right_x, right_w);
    }

    left.beside(right)
}

fn info_block(doc: &RenderDocument, page: &PageGeometry, fonts: &FontManager) -> Stack {
    let left_x = page.margin_left;
    let left_w = page.content_width() * LEFT_COLUMN;

    let mut bill_to = Stack::default();
    bill_to.paragraph(fonts, "Bill To:", &TextStyle::section_label(), left_x, left_w);
    bill_to.paragraph(
        fonts,
        &doc.bill_to.client_name,
        &TextStyle::normal_text(),
        left_x,
        left_w,
    );
    for line in &doc.bill_to.lines {
        bill_to.paragraph(fonts, line, &TextStyle::normal_text(), left_x, left_w);
    }

    // Right-aligned inside the right column.
    let table_w: f32 = META_COLUMNS.iter().sum();
    let label_x = page.margin_left + page.content_width() - table_w;
    let value_x = label_x + META_COLUMNS[0];
    let label_style = TextStyle::meta_label().with_weight(FontWeight::Bold);

    let mut meta = Stack::default();
    for row in &doc.meta {
        let top = meta.height + META_PADDING;
        let label = text_box(fonts, &row.label, &label_style, label_x, top, META_COLUMNS[0]);
        let value = text_box(fonts, &row.value, &TextStyle::meta_value(), value_x, top, META_COLUMNS[1]);
        let row_height = label.height.max(value.height) + 2.0 * META_PADDING;
        meta.boxes.push(label);
        meta.boxes.push(value);
        meta.height += row_height;
    }

    bill_to.beside(meta)
}

struct RowLook {
    style: TextStyle,
    padding: f32,
    fill: Color,
}

/// One table row: a filled box with a rule along its bottom edge and one
/// child box per cell, vertically centred.
fn item_row(fonts: &FontManager, cells: &[String; 4], widths: &[f32; 4], x: f32, look: &RowLook) -> LayoutBox {
    let last = cells.len() - 1;
    let mut children = Vec::with_capacity(cells.len());
    let mut cell_x = x;
    let mut content_height: f32 = 0.0;

    for (i, (text, width)) in cells.iter().zip(widths).enumerate() {
        let pad_left = if i == 0 { EDGE_CELL_PADDING } else { CELL_PADDING };
        let pad_right = if i == last { EDGE_CELL_PADDING } else { CELL_PADDING };
        let align = if i == 0 { TextAlign::Left } else { TextAlign::Right };
        let style = look.style.with_align(align);
        let cell = text_box(fonts, text, &style, cell_x + pad_left, 0.0, width - pad_left - pad_right);
        content_height = content_height.max(cell.height);
        children.push(cell);
        cell_x += width;
    }

    let row_height = content_height + 2.0 * look.padding;
    for cell in &mut children {
        cell.y = (row_height - cell.height) / 2.0;
    }

    let mut row = LayoutBox::new(x, 0.0, widths.iter().sum(), row_height);
    row.background_color = Some(look.fill.to_array());
    row.border = Some(BorderStyle {
        width: ROW_RULE_WIDTH,
        color: Color::BORDER.to_array(),
        sides: BorderSides::Bottom,
    });
    row.children = children;
    row
}

fn flow_items(flow: &mut Flow<'_>, table: &ItemsTable, accent: Color, page: &PageGeometry, fonts: &FontManager) {
    let content_w = page.content_width();
    let widths = ITEM_COLUMNS.map(|share| content_w * share);
    let x = page.margin_left;

    let header = item_row(
        fonts,
        &table.headers,
        &widths,
        x,
        &RowLook {
            style: TextStyle::table_header(),
            padding: ITEM_HEADER_PADDING,
            fill: accent,
        },
    );

    let mut rows = table.rows.iter().enumerate().map(|(i, cells)| {
        let fill = if i % 2 == 0 { Color::WHITE } else { Color::BG_LIGHT };
        item_row(
            fonts,
            cells,
            &widths,
            x,
            &RowLook {
                style: TextStyle::table_cell(),
                padding: ITEM_ROW_PADDING,
                fill,
            },
        )
    });

    // The header row never ends a page on its own.
    let first = rows.next();
    flow.ensure(header.height + first.as_ref().map_or(0.0, |row| row.height));
    flow.place_box(header);
    for row in first.into_iter().chain(rows) {
        flow.place_box(row);
    }
}

fn totals_block(doc: &RenderDocument, page: &PageGeometry, fonts: &FontManager) -> Stack {
    let x = page.margin_left;
    let label_col = page.content_width() * TOTALS_LABEL_COLUMN;
    let value_col = page.content_width() - label_col;

    let mut stack = Stack::default();
    for row in &doc.totals {
        let (label_style, value_style, padding) = if row.emphasis {
            let style = TextStyle::section_label().with_align(TextAlign::Right);
            (style, style, TOTAL_ROW_PADDING)
        } else {
            (TextStyle::meta_label(), TextStyle::meta_value(), TOTALS_ROW_PADDING)
        };

        let label = text_box(fonts, &row.label, &label_style, x, 0.0, label_col - TOTALS_RIGHT_PADDING);
        let value = text_box(
            fonts,
            &row.value,
            &value_style,
            x + label_col,
            0.0,
            value_col - TOTALS_RIGHT_PADDING,
        );
        let row_height = label.height.max(value.height) + 2.0 * padding;

        let mut row_box = LayoutBox::new(x, stack.height, page.content_width(), row_height);
        if row.emphasis {
            row_box.border = Some(BorderStyle {
                width: TOTAL_RULE_WIDTH,
                color: Color::BORDER.to_array(),
                sides: BorderSides::Top,
            });
        }
        for mut cell in [label, value] {
            cell.y = stack.height + padding;
            row_box.children.push(cell);
        }
        stack.push(row_box);
    }
    stack
}

fn flow_notes(flow: &mut Flow<'_>, notes: &str, page: &PageGeometry, fonts: &FontManager) {
    let label_style = TextStyle::section_label();
    let body_style = TextStyle::normal_text();

    let label = text_box(fonts, "Notes", &label_style, page.margin_left, 0.0, page.content_width());
    let lines = split_lines(text_box(
        fonts,
        notes,
        &body_style,
        page.margin_left,
        0.0,
        page.content_width(),
    ));

    // Keep the label with the first line of text.
    let label_advance = label.height + label_style.space_after + NOTES_LABEL_GAP;
    flow.ensure(label_advance + body_style.leading);
    flow.place_box(label);
    flow.y += label_style.space_after + NOTES_LABEL_GAP;

    for line in lines {
        flow.place_box(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::build_document;
    use crate::model::{Invoice, InvoiceItem, User};
    use crate::options::RenderOptions;
    use chrono::NaiveDate;

    fn invoice_with(items: usize, notes: Option<&str>) -> Invoice {
        let mut invoice = Invoice::new(
            "INV-00001",
            "Acme Corp",
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );
        invoice.notes = notes.map(str::to_string);
        invoice
            .set_items(
                (0..items)
                    .map(|i| InvoiceItem::new(format!("Service line {i}"), 1, 10.0).unwrap())
                    .collect(),
            )
            .unwrap();
        invoice
    }

    fn layout(invoice: &Invoice) -> LayoutConfig {
        let user = User {
            email: "me@example.com".into(),
            company_name: Some("Studio".into()),
            ..Default::default()
        };
        let doc = build_document(invoice, &user, &RenderOptions::default());
        compute_layout(&doc, &PageGeometry::a4(), &FontManager::new())
    }

    fn all_boxes(config: &LayoutConfig) -> impl Iterator<Item = (usize, &LayoutBox)> {
        config
            .pages
            .iter()
            .flat_map(|page| page.boxes.iter().map(move |b| (page.page_index, b)))
    }

    #[test]
    fn small_invoice_fits_one_page() {
        let config = layout(&invoice_with(2, None));
        assert_eq!(config.pages.len(), 1);
        assert_eq!(config.title, "INV-00001");

        let text = config.text_lines();
        for expected in ["Studio", "Invoice", "Bill To:", "Items", "Subtotal", "Total"] {
            assert!(text.contains(&expected), "missing {expected:?} in {text:?}");
        }
        assert_eq!(text.last(), Some(&crate::document::FOOTER_NOTE));
        assert!(!text.contains(&"Notes"));
    }

    #[test]
    fn sections_keep_their_order() {
        let config = layout(&invoice_with(1, Some("Thanks")));
        let y_of = |needle: &str| {
            all_boxes(&config)
                .find(|(_, b)| {
                    let mut found = Vec::new();
                    b.collect_text(&mut found);
                    found.contains(&needle)
                })
                .map(|(_, b)| b.y)
                .unwrap()
        };
        assert!(y_of("Bill To:") > y_of("Studio"));
        assert!(y_of("Items") > y_of("Bill To:"));
        assert!(y_of("Subtotal") > y_of("Items"));
        assert!(y_of("Notes") > y_of("Subtotal"));
        assert!(y_of(crate::document::FOOTER_NOTE) > y_of("Thanks"));
    }

    #[test]
    fn long_tables_flow_across_pages() {
        let config = layout(&invoice_with(80, None));
        assert!(config.pages.len() > 1);

        let bottom = PageGeometry::a4().content_bottom();
        for (_, lbox) in all_boxes(&config) {
            assert!(lbox.bottom() <= bottom + 0.1, "box overflows page: {lbox:?}");
        }

        // Header row appears once, every item row is present.
        let text = config.text_lines();
        assert_eq!(text.iter().filter(|t| **t == "Items").count(), 1);
        assert_eq!(text.iter().filter(|t| t.starts_with("Service line")).count(), 80);
    }

    #[test]
    fn continuation_pages_start_at_top_margin() {
        let config = layout(&invoice_with(80, None));
        let top = PageGeometry::a4().margin_top;
        for page in &config.pages[1..] {
            let first = &page.boxes[0];
            assert!((first.y - top).abs() < 0.01, "page {} starts at {}", page.page_index, first.y);
        }
    }

    #[test]
    fn rows_are_banded() {
        let config = layout(&invoice_with(3, None));
        let fills: Vec<_> = all_boxes(&config)
            .filter(|(_, b)| {
                matches!(b.border, Some(BorderStyle { sides: BorderSides::Bottom, .. }))
            })
            .map(|(_, b)| b.background_color.unwrap())
            .collect();
        // header + 3 rows
        assert_eq!(fills.len(), 4);
        assert_eq!(fills[1], Color::WHITE.to_array());
        assert_eq!(fills[2], Color::BG_LIGHT.to_array());
        assert_eq!(fills[3], Color::WHITE.to_array());
    }

    #[test]
    fn long_notes_flow_line_by_line() {
        let notes = "Payment terms apply. ".repeat(400);
        let config = layout(&invoice_with(1, Some(&notes)));
        assert!(config.pages.len() > 1);
        let bottom = PageGeometry::a4().content_bottom();
        for (_, lbox) in all_boxes(&config) {
            assert!(lbox.bottom() <= bottom + 0.1);
        }
    }

    #[test]
    fn notes_lines_are_one_leading_apart() {
        let config = layout(&invoice_with(1, Some("Line A\nLine B\nLine C\nLine D")));
        let tops: Vec<f32> = all_boxes(&config)
            .filter(|(_, b)| {
                b.text
                    .as_ref()
                    .is_some_and(|t| t.lines.len() == 1 && t.lines[0].text.starts_with("Line "))
            })
            .map(|(_, b)| b.y)
            .collect();
        assert_eq!(tops.len(), 4);
        let leading = TextStyle::normal_text().leading;
        for pair in tops.windows(2) {
            assert!((pair[1] - pair[0] - leading).abs() < 0.01, "tops {tops:?}");
        }
    }

    #[test]
    fn text_stays_inside_columns() {
        let config = layout(&invoice_with(1, Some(&"x".repeat(500))));
        let page = PageGeometry::a4();
        let right = page.margin_left + page.content_width();
        for (_, lbox) in all_boxes(&config) {
            assert!(lbox.x + lbox.width <= right + 0.1);
        }
    }

    #[test]
    fn gap_is_swallowed_at_page_top() {
        let page = PageGeometry::a4();
        let mut flow = Flow::new(&page);
        flow.gap(50.0);
        assert_eq!(flow.y, page.margin_top);
    }
}
