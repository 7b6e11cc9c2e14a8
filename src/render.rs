//! PDF renderer – takes a [`LayoutConfig`] and serialises it into PDF 1.7
//! bytes.
//!
//! The writer emits no timestamps and no document IDs and iterates only
//! ordered collections, so the same layout and fonts always produce the same
//! bytes. Content, image, font and CMap streams are Flate-compressed.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;

use log::warn;
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::error::RenderError;
use crate::fonts::{CustomFont, FontManager, HELVETICA, HELVETICA_BOLD};
use crate::layout_config::*;

const COMPRESSION_LEVEL: u8 = 6;
const PRODUCER: &str = concat!("invoice-forge ", env!("CARGO_PKG_VERSION"));

/// Render a LayoutConfig into PDF bytes.
///
/// Images that cannot be read or decoded are skipped with a warning. Text
/// whose font family is neither Helvetica nor the registered custom font is
/// set in Helvetica.
pub fn render_pdf(config: &LayoutConfig, fonts: &FontManager) -> Result<Vec<u8>, RenderError> {
    let mut builder = PdfBuilder::new();

    let font_resources = register_fonts(&mut builder, config, fonts)?;
    let image_resources = register_images(&mut builder, config)?;
    let resources = resource_dict(&font_resources, &image_resources);

    let blank = [PageLayout::new(0)];
    let pages = if config.pages.is_empty() {
        &blank[..]
    } else {
        &config.pages[..]
    };

    let mut page_ids = Vec::with_capacity(pages.len());
    for page in pages {
        let mut content = Vec::new();
        for lbox in &page.boxes {
            write_box(&mut content, lbox, config.page_height_pt, &font_resources, &image_resources)?;
        }
        let content_id = builder.push_stream("", &content)?;

        let page_dict = format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Contents {content_id} 0 R /Resources {resources} >>",
            num(config.page_width_pt),
            num(config.page_height_pt),
        );
        page_ids.push(builder.push(page_dict.into_bytes()));
    }

    builder.set(1, b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    let kids = page_ids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");
    builder.set(
        2,
        format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", page_ids.len()).into_bytes(),
    );

    let info_id = builder.push(
        format!(
            "<< /Title {} /Producer {} >>",
            text_string(&config.title),
            text_string(PRODUCER)
        )
        .into_bytes(),
    );

    builder.serialize(info_id)
}

// ---------------------------------------------------------------------------
// Object table
// ---------------------------------------------------------------------------

struct PdfObject {
    id: usize,
    data: Vec<u8>,
}

struct PdfBuilder {
    objects: Vec<PdfObject>,
}

impl PdfBuilder {
    /// Objects 0 (free), 1 (Catalog) and 2 (Pages) are reserved up front.
    fn new() -> Self {
        Self {
            objects: (0..3).map(|id| PdfObject { id, data: Vec::new() }).collect(),
        }
    }

    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { id, data });
        id
    }

    fn set(&mut self, id: usize, data: Vec<u8>) {
        self.objects[id].data = data;
    }

    /// Compress `raw` and store it as a stream; `dict_entries` are extra
    /// dictionary entries such as `/Length1 123`.
    fn push_stream(&mut self, dict_entries: &str, raw: &[u8]) -> Result<usize, RenderError> {
        let compressed = compress_to_vec_zlib(raw, COMPRESSION_LEVEL);
        let mut data = Vec::with_capacity(compressed.len() + 64);
        write!(
            data,
            "<< /Length {} /Filter /FlateDecode{}{} >>\nstream\n",
            compressed.len(),
            if dict_entries.is_empty() { "" } else { " " },
            dict_entries
        )?;
        data.extend_from_slice(&compressed);
        data.extend_from_slice(b"\nendstream");
        Ok(self.push(data))
    }

    fn serialize(&self, info_id: usize) -> Result<Vec<u8>, RenderError> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets = vec![0usize; self.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n");

        for obj in self.objects.iter().skip(1) {
            offsets[obj.id] = output.len();
            write!(output, "{} 0 obj\n", obj.id)?;
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = output.len();
        write!(output, "xref\n0 {}\n", self.objects.len())?;
        write!(output, "0000000000 65535 f \n")?;
        for offset in &offsets[1..] {
            write!(output, "{offset:010} 00000 n \n")?;
        }
        write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {info_id} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            self.objects.len()
        )?;

        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Fonts
// ---------------------------------------------------------------------------

/// How text in one resolved font is encoded in content streams.
enum FontEncoding {
    /// One WinAnsi byte per character.
    WinAnsi,
    /// Two-byte glyph IDs (Identity-H).
    Glyphs(BTreeMap<char, u16>),
}

struct FontResource {
    name: String,
    object_id: usize,
    encoding: FontEncoding,
}

/// Resolved fonts keyed by PDF base font name.
type FontResources = BTreeMap<String, FontResource>;

/// The font actually used for a text box.
fn resolve_font<'a>(text: &TextContent, fonts: &'a FontManager) -> (&'a str, Option<&'a CustomFont>) {
    match fonts.custom() {
        Some(custom) if custom.family == text.font_family => (custom.family.as_str(), Some(custom)),
        _ if text.font_family == HELVETICA_BOLD => (HELVETICA_BOLD, None),
        _ if text.font_family == HELVETICA => (HELVETICA, None),
        _ => {
            let fallback = if text.bold { HELVETICA_BOLD } else { HELVETICA };
            warn!("font {} is not registered; using {fallback}", text.font_family);
            (fallback, None)
        }
    }
}

fn register_fonts(
    builder: &mut PdfBuilder,
    config: &LayoutConfig,
    fonts: &FontManager,
) -> Result<FontResources, RenderError> {
    let mut used: BTreeMap<String, (Option<&CustomFont>, BTreeSet<char>)> = BTreeMap::new();
    for page in &config.pages {
        for lbox in &page.boxes {
            for_each_text(lbox, &mut |text| {
                let (name, custom) = resolve_font(text, fonts);
                let entry = used.entry(name.to_string()).or_insert((custom, BTreeSet::new()));
                entry
                    .1
                    .extend(text.lines.iter().flat_map(|line| line.text.chars()));
            });
        }
    }

    let mut resources = FontResources::new();
    for (index, (base_font, (custom, chars))) in used.into_iter().enumerate() {
        let (object_id, encoding) = match custom {
            Some(font) => {
                let (id, glyphs) = write_custom_font(builder, font, &chars)?;
                (id, FontEncoding::Glyphs(glyphs))
            }
            None => {
                let dict = format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{base_font} \
                     /Encoding /WinAnsiEncoding >>"
                );
                (builder.push(dict.into_bytes()), FontEncoding::WinAnsi)
            }
        };
        resources.insert(
            base_font,
            FontResource {
                name: format!("F{}", index + 1),
                object_id,
                encoding,
            },
        );
    }
    Ok(resources)
}

fn for_each_text<'a>(lbox: &'a LayoutBox, f: &mut dyn FnMut(&'a TextContent)) {
    if let Some(text) = &lbox.text {
        f(text);
    }
    for child in &lbox.children {
        for_each_text(child, f);
    }
}

/// Embed the whole TrueType file as a CIDFontType2 with Identity-H encoding.
/// Returns the Type0 font object ID and the char → glyph map.
fn write_custom_font(
    builder: &mut PdfBuilder,
    font: &CustomFont,
    chars: &BTreeSet<char>,
) -> Result<(usize, BTreeMap<char, u16>), RenderError> {
    let face = ttf_parser::Face::parse(&font.bytes, 0).map_err(|e| RenderError::Font {
        family: font.family.clone(),
        reason: e.to_string(),
    })?;
    if face.tables().glyf.is_none() {
        return Err(RenderError::Font {
            family: font.family.clone(),
            reason: "no glyf table for FontFile2".to_string(),
        });
    }

    let glyphs: BTreeMap<char, u16> = chars
        .iter()
        .map(|&ch| (ch, face.glyph_index(ch).map_or(0, |gid| gid.0)))
        .collect();

    let scale = 1000.0 / f32::from(face.units_per_em());
    let em = |v: i16| (f32::from(v) * scale).round() as i32;

    let fontfile_id = builder.push_stream(&format!("/Length1 {}", font.bytes.len()), &font.bytes)?;

    let bbox = face.global_bounding_box();
    let descriptor = format!(
        "<< /Type /FontDescriptor /FontName /{name} /Flags 32 \
         /FontBBox [{} {} {} {}] /ItalicAngle 0 /Ascent {} /Descent {} \
         /CapHeight {} /StemV 80 /FontFile2 {fontfile_id} 0 R >>",
        em(bbox.x_min),
        em(bbox.y_min),
        em(bbox.x_max),
        em(bbox.y_max),
        em(face.ascender()),
        em(face.descender()),
        em(face.capital_height().unwrap_or_else(|| face.ascender())),
        name = font.family,
    );
    let descriptor_id = builder.push(descriptor.into_bytes());

    let widths: BTreeMap<u16, i32> = glyphs
        .values()
        .map(|&gid| {
            let advance = face.glyph_hor_advance(ttf_parser::GlyphId(gid)).unwrap_or(0);
            (gid, (f32::from(advance) * scale).round() as i32)
        })
        .collect();
    let w_array = widths
        .iter()
        .map(|(gid, width)| format!("{gid} [{width}]"))
        .collect::<Vec<_>>()
        .join(" ");
    let cid_font = format!(
        "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{name} \
         /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
         /FontDescriptor {descriptor_id} 0 R /DW 1000 /W [{w_array}] /CIDToGIDMap /Identity >>",
        name = font.family,
    );
    let cid_font_id = builder.push(cid_font.into_bytes());

    let cmap = to_unicode_cmap(&glyphs, &font.family);
    let cmap_id = builder.push_stream("", cmap.as_bytes())?;

    let type0 = format!(
        "<< /Type /Font /Subtype /Type0 /BaseFont /{name} /Encoding /Identity-H \
         /DescendantFonts [{cid_font_id} 0 R] /ToUnicode {cmap_id} 0 R >>",
        name = font.family,
    );
    Ok((builder.push(type0.into_bytes()), glyphs))
}

fn to_unicode_cmap(glyphs: &BTreeMap<char, u16>, font_name: &str) -> String {
    let mut by_gid: BTreeMap<u16, char> = BTreeMap::new();
    for (&ch, &gid) in glyphs {
        if gid != 0 {
            by_gid.entry(gid).or_insert(ch);
        }
    }

    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
    cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    cmap.push_str(&format!("/CMapName /{font_name}-UTF16 def\n/CMapType 2 def\n"));
    cmap.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let entries: Vec<(u16, char)> = by_gid.into_iter().collect();
    // At most 100 entries per bfchar block.
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, ch) in chunk {
            let utf16: String = ch
                .encode_utf16(&mut [0u16; 2])
                .iter()
                .map(|unit| format!("{unit:04X}"))
                .collect();
            cmap.push_str(&format!("<{gid:04X}> <{utf16}>\n"));
        }
        cmap.push_str("endbfchar\n");
    }
    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

struct ImageResource {
    name: String,
    object_id: usize,
}

type ImageResources = BTreeMap<String, ImageResource>;

fn register_images(builder: &mut PdfBuilder, config: &LayoutConfig) -> Result<ImageResources, RenderError> {
    let mut srcs: BTreeSet<&str> = BTreeSet::new();
    for page in &config.pages {
        for lbox in &page.boxes {
            collect_image_srcs(lbox, &mut srcs);
        }
    }

    let mut resources = ImageResources::new();
    for src in srcs {
        let decoded = match image::open(Path::new(src)) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                warn!("Skipping image {src}: {e}");
                continue;
            }
        };
        let object_id = write_image(builder, &decoded)?;
        resources.insert(
            src.to_string(),
            ImageResource {
                name: format!("Im{}", resources.len() + 1),
                object_id,
            },
        );
    }
    Ok(resources)
}

fn collect_image_srcs<'a>(lbox: &'a LayoutBox, srcs: &mut BTreeSet<&'a str>) {
    if let Some(img) = &lbox.image {
        srcs.insert(img.src.as_str());
    }
    for child in &lbox.children {
        collect_image_srcs(child, srcs);
    }
}

/// RGB image XObject, with a DeviceGray soft mask when any pixel is not
/// fully opaque.
fn write_image(builder: &mut PdfBuilder, rgba: &image::RgbaImage) -> Result<usize, RenderError> {
    let (width, height) = rgba.dimensions();
    let pixel_count = (width as usize) * (height as usize);
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let common = format!("/Type /XObject /Subtype /Image /Width {width} /Height {height} /BitsPerComponent 8");
    let smask = if alpha.iter().any(|&a| a < 255) {
        let id = builder.push_stream(&format!("{common} /ColorSpace /DeviceGray"), &alpha)?;
        format!(" /SMask {id} 0 R")
    } else {
        String::new()
    };
    builder.push_stream(&format!("{common} /ColorSpace /DeviceRGB{smask}"), &rgb)
}

fn resource_dict(fonts: &FontResources, images: &ImageResources) -> String {
    let font_entries = fonts
        .values()
        .map(|f| format!("/{} {} 0 R", f.name, f.object_id))
        .collect::<Vec<_>>()
        .join(" ");
    let mut dict = format!("<< /Font << {font_entries} >>");
    if !images.is_empty() {
        let image_entries = images
            .values()
            .map(|img| format!("/{} {} 0 R", img.name, img.object_id))
            .collect::<Vec<_>>()
            .join(" ");
        dict.push_str(&format!(" /XObject << {image_entries} >>"));
    }
    dict.push_str(" >>");
    dict
}

// ---------------------------------------------------------------------------
// Content streams
// ---------------------------------------------------------------------------

/// Recursively write a LayoutBox and its children as content stream
/// operators. Layout y grows downwards from the page top; PDF y grows
/// upwards from the page bottom.
fn write_box(
    out: &mut Vec<u8>,
    lbox: &LayoutBox,
    page_height: f32,
    fonts: &FontResources,
    images: &ImageResources,
) -> Result<(), RenderError> {
    let top = page_height - lbox.y;
    let bottom = top - lbox.height;
    let right = lbox.x + lbox.width;

    if let Some(bg) = &lbox.background_color {
        writeln!(out, "{} rg", rgb(bg))?;
        writeln!(
            out,
            "{} {} {} {} re f",
            num(lbox.x),
            num(bottom),
            num(lbox.width),
            num(lbox.height)
        )?;
    }

    if let Some(border) = &lbox.border {
        writeln!(out, "{} RG {} w", rgb(&border.color), num(border.width))?;
        match border.sides {
            BorderSides::All => writeln!(
                out,
                "{} {} {} {} re S",
                num(lbox.x),
                num(bottom),
                num(lbox.width),
                num(lbox.height)
            )?,
            BorderSides::Top => writeln!(out, "{} {} m {} {} l S", num(lbox.x), num(top), num(right), num(top))?,
            BorderSides::Bottom => {
                writeln!(out, "{} {} m {} {} l S", num(lbox.x), num(bottom), num(right), num(bottom))?
            }
        }
    }

    if let Some(img) = &lbox.image {
        if let Some(res) = images.get(&img.src) {
            writeln!(
                out,
                "q {} 0 0 {} {} {} cm /{} Do Q",
                num(img.width),
                num(img.height),
                num(lbox.x),
                num(top - img.height),
                res.name
            )?;
        }
    }

    if let Some(text) = &lbox.text {
        write_text(out, lbox, text, page_height, fonts)?;
    }

    for child in &lbox.children {
        write_box(out, child, page_height, fonts, images)?;
    }
    Ok(())
}

fn write_text(
    out: &mut Vec<u8>,
    lbox: &LayoutBox,
    text: &TextContent,
    page_height: f32,
    fonts: &FontResources,
) -> Result<(), RenderError> {
    let Some(font) = fonts.get(font_key(text, fonts)) else {
        return Ok(());
    };

    for line in text.lines.iter().filter(|line| !line.text.is_empty()) {
        let x = lbox.x + line.x_offset;
        let y = page_height - lbox.y - line.baseline;
        writeln!(
            out,
            "BT /{} {} Tf {} rg {} {} Td <{}> Tj ET",
            font.name,
            num(text.font_size),
            rgb(&text.color),
            num(x),
            num(y),
            encode_text(&line.text, &font.encoding)
        )?;
    }
    Ok(())
}

/// Mirror of [`resolve_font`] over the registered resources.
fn font_key<'a>(text: &'a TextContent, fonts: &FontResources) -> &'a str {
    if fonts.contains_key(&text.font_family) {
        &text.font_family
    } else if text.bold {
        HELVETICA_BOLD
    } else {
        HELVETICA
    }
}

fn encode_text(text: &str, encoding: &FontEncoding) -> String {
    match encoding {
        FontEncoding::WinAnsi => text.chars().map(|ch| format!("{:02X}", to_winansi(ch))).collect(),
        FontEncoding::Glyphs(glyphs) => text
            .chars()
            .map(|ch| format!("{:04X}", glyphs.get(&ch).copied().unwrap_or(0)))
            .collect(),
    }
}

/// Windows-1252 byte for `ch`; `?` when WinAnsiEncoding has no glyph for it.
fn to_winansi(ch: char) -> u8 {
    let code = ch as u32;
    if (0x20..=0x7E).contains(&code) || (0xA0..=0xFF).contains(&code) {
        return code as u8;
    }
    match ch {
        '\u{20AC}' => 0x80, // euro
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85, // ellipsis
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91, // curly quotes
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95, // bullet
        '\u{2013}' => 0x96, // en-dash
        '\u{2014}' => 0x97, // em-dash
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99, // trademark
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        '\t' => b' ',
        _ => b'?',
    }
}

/// A PDF text string: literal for printable ASCII, UTF-16BE hex otherwise.
fn text_string(s: &str) -> String {
    if s.chars().all(|c| (' '..='~').contains(&c)) {
        let escaped = s.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)");
        format!("({escaped})")
    } else {
        let hex: String = s.encode_utf16().map(|unit| format!("{unit:04X}")).collect();
        format!("<FEFF{hex}>")
    }
}

fn num(v: f32) -> String {
    let s = format!("{v:.2}");
    match s.as_str() {
        "-0.00" => "0.00".to_string(),
        _ => s,
    }
}

fn rgb(color: &[f32; 4]) -> String {
    format!("{} {} {}", num(color[0]), num(color[1]), num(color[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::TextAlign;
    use miniz_oxide::inflate::decompress_to_vec_zlib;

    fn text_box(text: &str, family: &str, bold: bool) -> LayoutBox {
        let mut lbox = LayoutBox::new(72.0, 72.0, 200.0, 13.0);
        lbox.text = Some(TextContent {
            lines: vec![TextLine {
                text: text.to_string(),
                x_offset: 0.0,
                baseline: 9.0,
            }],
            font_family: family.to_string(),
            font_size: 9.0,
            bold,
            color: [0.0, 0.0, 0.0, 1.0],
            line_height: 13.0,
            text_align: TextAlign::Left,
        });
        lbox
    }

    fn one_page(boxes: Vec<LayoutBox>) -> LayoutConfig {
        let mut config = LayoutConfig::a4();
        let mut page = PageLayout::new(0);
        page.boxes = boxes;
        config.pages.push(page);
        config
    }

    /// Inflate every Flate stream in the file and concatenate the results.
    fn inflated_streams(pdf: &[u8]) -> String {
        let mut out = String::new();
        let mut rest = pdf;
        while let Some(start) = find(rest, b"stream\n") {
            let body = &rest[start + 7..];
            let Some(end) = find(body, b"\nendstream") else { break };
            if let Ok(raw) = decompress_to_vec_zlib(&body[..end]) {
                out.push_str(&String::from_utf8_lossy(&raw));
            }
            rest = &body[end + b"\nendstream".len()..];
        }
        out
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn render_empty_page() {
        let config = LayoutConfig::a4();
        let bytes = render_pdf(&config, &FontManager::new()).unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        // PDF magic number
        assert_eq!(&bytes[0..5], b"%PDF-");
        assert!(bytes.ends_with(b"%%EOF\n"));
        assert!(find(&bytes, b"/Count 1").is_some());
    }

    #[test]
    fn startxref_points_at_xref_table() {
        let bytes = render_pdf(&one_page(vec![text_box("Hi", HELVETICA, false)]), &FontManager::new()).unwrap();
        let tail = String::from_utf8_lossy(&bytes[bytes.len() - 40..]).to_string();
        let offset: usize = tail
            .split("startxref\n")
            .nth(1)
            .and_then(|s| s.lines().next())
            .and_then(|s| s.parse().ok())
            .unwrap();
        assert!(bytes[offset..].starts_with(b"xref\n"));
    }

    #[test]
    fn builtin_text_is_winansi_hex() {
        let config = one_page(vec![text_box("Total", HELVETICA_BOLD, true)]);
        let bytes = render_pdf(&config, &FontManager::new()).unwrap();
        assert!(find(&bytes, b"/BaseFont /Helvetica-Bold").is_some());
        // T o t a l
        assert!(inflated_streams(&bytes).contains("<546F74616C> Tj"));
    }

    #[test]
    fn unknown_family_falls_back_to_helvetica() {
        let config = one_page(vec![text_box("x", "Missing-Font", false)]);
        let bytes = render_pdf(&config, &FontManager::new()).unwrap();
        assert!(find(&bytes, b"/BaseFont /Helvetica ").is_some());
        assert!(inflated_streams(&bytes).contains("/F1 9.00 Tf"));
    }

    #[test]
    fn rules_and_fills() {
        let mut row = LayoutBox::new(70.0, 100.0, 400.0, 30.0);
        row.background_color = Some([1.0, 1.0, 1.0, 1.0]);
        row.border = Some(BorderStyle {
            width: 0.5,
            color: [0.9, 0.9, 0.9, 1.0],
            sides: BorderSides::Bottom,
        });
        let content = inflated_streams(&render_pdf(&one_page(vec![row]), &FontManager::new()).unwrap());
        assert!(content.contains("1.00 1.00 1.00 rg"));
        // bottom edge: 841.89 - 100 - 30
        assert!(content.contains("70.00 711.89 m 470.00 711.89 l S"));
    }

    #[test]
    fn unreadable_image_is_skipped() {
        let mut logo = LayoutBox::new(70.0, 56.0, 70.0, 70.0);
        logo.image = Some(ImageContent {
            src: "/nonexistent/logo.png".into(),
            width: 70.0,
            height: 70.0,
        });
        let bytes = render_pdf(&one_page(vec![logo]), &FontManager::new()).unwrap();
        assert!(find(&bytes, b"/Subtype /Image").is_none());
        assert!(!inflated_streams(&bytes).contains(" Do "));
    }

    #[test]
    fn identical_input_identical_bytes() {
        let config = one_page(vec![text_box("Invoice", HELVETICA, false)]);
        let a = render_pdf(&config, &FontManager::new()).unwrap();
        let b = render_pdf(&config, &FontManager::new()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn winansi_mapping() {
        assert_eq!(to_winansi('A'), 0x41);
        assert_eq!(to_winansi('€'), 0x80);
        assert_eq!(to_winansi('é'), 0xE9);
        assert_eq!(to_winansi('中'), b'?');
    }

    #[test]
    fn text_strings() {
        assert_eq!(text_string("INV-00001"), "(INV-00001)");
        assert_eq!(text_string("a(b)"), "(a\\(b\\))");
        assert_eq!(text_string("é"), "<FEFF00E9>");
    }

    #[test]
    fn cmap_maps_glyphs_to_unicode() {
        let glyphs = BTreeMap::from([('A', 36u16), ('€', 200u16), ('?', 0u16)]);
        let cmap = to_unicode_cmap(&glyphs, "Test");
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0024> <0041>"));
        assert!(cmap.contains("<00C8> <20AC>"));
    }

    #[test]
    fn numbers_are_fixed_precision() {
        assert_eq!(num(1.0), "1.00");
        assert_eq!(num(-0.001), "0.00");
        assert_eq!(num(70.866), "70.87");
    }
}
