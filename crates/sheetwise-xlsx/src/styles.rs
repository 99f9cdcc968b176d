//! styles.xml read/write helpers

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use sheetwise_core::style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, Style, VerticalAlignment,
};
use sheetwise_core::Workbook;

// === Writing ===

/// Workbook-wide cellXfs table built from the per-sheet style pools
#[derive(Debug)]
pub(crate) struct XlsxStyleTable {
    /// Deduplicated styles; position is the xf id
    styles: Vec<Style>,
    /// Per worksheet: local pool index -> xf id
    sheet_maps: Vec<HashMap<u32, u32>>,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedXfIds {
    font_id: usize,
    fill_id: usize,
    border_id: usize,
}

impl XlsxStyleTable {
    pub(crate) fn build(workbook: &Workbook) -> Self {
        let mut styles = vec![Style::default()];
        let mut style_to_xf: HashMap<Style, u32> = HashMap::new();
        style_to_xf.insert(Style::default(), 0);

        let mut sheet_maps = Vec::with_capacity(workbook.sheet_count());
        for sheet in workbook.worksheets() {
            let mut map: HashMap<u32, u32> = HashMap::new();
            map.insert(0, 0);

            for (_, _, cell) in sheet.iter_cells() {
                let local = cell.style_index;
                if map.contains_key(&local) {
                    continue;
                }
                let style = sheet.style_pool().get(local).cloned().unwrap_or_default();
                let xf_id = *style_to_xf.entry(style.clone()).or_insert_with(|| {
                    styles.push(style);
                    (styles.len() - 1) as u32
                });
                map.insert(local, xf_id);
            }

            sheet_maps.push(map);
        }

        Self { styles, sheet_maps }
    }

    pub(crate) fn xf_id_for(&self, sheet_index: usize, local_style_index: u32) -> u32 {
        self.sheet_maps
            .get(sheet_index)
            .and_then(|m| m.get(&local_style_index).copied())
            .unwrap_or(0)
    }

    pub(crate) fn to_styles_xml(&self) -> String {
        let mut fonts: Vec<FontStyle> = vec![FontStyle::default()];
        // Excel requires fill 0 = none and fill 1 = gray125; custom fills start at 2
        let mut fills: Vec<FillStyle> = Vec::new();
        let mut borders: Vec<BorderStyle> = vec![BorderStyle::default()];

        let resolved: Vec<ResolvedXfIds> = self
            .styles
            .iter()
            .map(|style| ResolvedXfIds {
                font_id: index_of_or_push(&mut fonts, &style.font),
                fill_id: match &style.fill {
                    FillStyle::None => 0,
                    fill => 2 + index_of_or_push(&mut fills, fill),
                },
                border_id: index_of_or_push(&mut borders, &style.border),
            })
            .collect();

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        xml.push_str(&format!("\n  <fonts count=\"{}\">", fonts.len()));
        for font in &fonts {
            xml.push_str("\n    ");
            xml.push_str(&write_font(font));
        }
        xml.push_str("\n  </fonts>");

        xml.push_str(&format!("\n  <fills count=\"{}\">", fills.len() + 2));
        xml.push_str("\n    <fill><patternFill patternType=\"none\"/></fill>");
        xml.push_str("\n    <fill><patternFill patternType=\"gray125\"/></fill>");
        for fill in &fills {
            xml.push_str("\n    ");
            xml.push_str(&write_fill(fill));
        }
        xml.push_str("\n  </fills>");

        xml.push_str(&format!("\n  <borders count=\"{}\">", borders.len()));
        for border in &borders {
            xml.push_str("\n    ");
            xml.push_str(&write_border(border));
        }
        xml.push_str("\n  </borders>");

        xml.push_str(
            r#"
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>"#,
        );

        xml.push_str(&format!("\n  <cellXfs count=\"{}\">", self.styles.len()));
        for (style, ids) in self.styles.iter().zip(&resolved) {
            xml.push_str("\n    ");
            xml.push_str(&write_xf(style, *ids));
        }
        xml.push_str("\n  </cellXfs>");

        xml.push_str(
            r#"
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
</styleSheet>"#,
        );
        xml
    }
}

fn index_of_or_push<T: PartialEq + Clone>(items: &mut Vec<T>, item: &T) -> usize {
    match items.iter().position(|existing| existing == item) {
        Some(i) => i,
        None => {
            items.push(item.clone());
            items.len() - 1
        }
    }
}

pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn write_color(tag: &str, color: &Color) -> String {
    match color.to_argb_hex() {
        Some(hex) => format!("<{tag} rgb=\"{hex}\"/>"),
        None => format!("<{tag} indexed=\"64\"/>"),
    }
}

fn write_font(font: &FontStyle) -> String {
    let mut s = String::from("<font>");
    if font.bold {
        s.push_str("<b/>");
    }
    if font.italic {
        s.push_str("<i/>");
    }
    s.push_str(&format!("<sz val=\"{}\"/>", font.size));
    if !font.color.is_auto() {
        s.push_str(&write_color("color", &font.color));
    }
    s.push_str(&format!("<name val=\"{}\"/>", escape_xml(&font.name)));
    s.push_str("</font>");
    s
}

fn write_fill(fill: &FillStyle) -> String {
    match fill {
        FillStyle::None => "<fill><patternFill patternType=\"none\"/></fill>".to_string(),
        FillStyle::Solid { color } => format!(
            "<fill><patternFill patternType=\"solid\">{}<bgColor indexed=\"64\"/></patternFill></fill>",
            write_color("fgColor", color)
        ),
    }
}

fn write_border_edge(tag: &str, edge: &Option<BorderEdge>) -> String {
    match edge {
        Some(e) if e.style != BorderLineStyle::None => format!(
            "<{tag} style=\"{}\">{}</{tag}>",
            e.style.as_str(),
            write_color("color", &e.color)
        ),
        _ => format!("<{tag}/>"),
    }
}

fn write_border(border: &BorderStyle) -> String {
    format!(
        "<border>{}{}{}{}<diagonal/></border>",
        write_border_edge("left", &border.left),
        write_border_edge("right", &border.right),
        write_border_edge("top", &border.top),
        write_border_edge("bottom", &border.bottom)
    )
}

fn write_alignment(al: &Alignment) -> String {
    let default = Alignment::default();
    let mut s = String::from("<alignment");
    if al.horizontal != default.horizontal {
        s.push_str(&format!(" horizontal=\"{}\"", al.horizontal.as_str()));
    }
    if al.vertical != default.vertical {
        s.push_str(&format!(" vertical=\"{}\"", al.vertical.as_str()));
    }
    if al.wrap_text {
        s.push_str(" wrapText=\"1\"");
    }
    s.push_str("/>");
    s
}

fn write_xf(style: &Style, ids: ResolvedXfIds) -> String {
    let mut attrs = String::new();
    if style.font != FontStyle::default() {
        attrs.push_str(" applyFont=\"1\"");
    }
    if !style.fill.is_none() {
        attrs.push_str(" applyFill=\"1\"");
    }
    if !style.border.is_empty() {
        attrs.push_str(" applyBorder=\"1\"");
    }
    if !style.alignment.is_default() {
        attrs.push_str(" applyAlignment=\"1\"");
    }

    let open = format!(
        "<xf numFmtId=\"0\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"0\"{}",
        ids.font_id, ids.fill_id, ids.border_id, attrs
    );
    if style.alignment.is_default() {
        format!("{open}/>")
    } else {
        format!("{open}>{}</xf>", write_alignment(&style.alignment))
    }
}

// === Reading ===

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Other,
    Fonts,
    Fills,
    Borders,
    CellXfs,
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug)]
struct PendingXf {
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: Alignment,
}

/// Parse styles.xml into the cellXfs table; position is the `s` attribute of a cell
pub(crate) fn read_styles_xml<R: Read>(reader: R) -> XlsxResult<Vec<Style>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut section = Section::Other;

    let mut fonts: Vec<FontStyle> = Vec::new();
    let mut fills: Vec<FillStyle> = Vec::new();
    let mut borders: Vec<BorderStyle> = Vec::new();
    let mut cell_xfs: Vec<Style> = Vec::new();

    let mut current_font: Option<FontStyle> = None;
    let mut current_fill: Option<(bool, Color)> = None;
    let mut current_border: Option<BorderStyle> = None;
    let mut current_edge: Option<Edge> = None;
    let mut current_xf: Option<PendingXf> = None;

    loop {
        let (e, empty) = match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => (e.into_owned(), false),
            Ok(Event::Empty(e)) => (e.into_owned(), true),
            Ok(Event::End(e)) => {
                match e.name().as_ref() {
                    b"fonts" | b"fills" | b"borders" | b"cellXfs" => section = Section::Other,
                    b"font" => fonts.extend(current_font.take()),
                    b"fill" => fills.extend(current_fill.take().map(finish_fill)),
                    b"border" => borders.extend(current_border.take()),
                    b"left" | b"right" | b"top" | b"bottom" => current_edge = None,
                    b"xf" => {
                        if let Some(xf) = current_xf.take() {
                            cell_xfs.push(resolve_style(&xf, &fonts, &fills, &borders));
                        }
                    }
                    _ => {}
                }
                buf.clear();
                continue;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {
                buf.clear();
                continue;
            }
        };

        match (section, e.name().as_ref()) {
            (_, b"fonts") if !empty => section = Section::Fonts,
            (_, b"fills") if !empty => section = Section::Fills,
            (_, b"borders") if !empty => section = Section::Borders,
            (_, b"cellXfs") if !empty => section = Section::CellXfs,

            (Section::Fonts, b"font") => {
                if empty {
                    fonts.push(FontStyle::default());
                } else {
                    current_font = Some(FontStyle::default());
                }
            }
            (Section::Fonts, b"b") => {
                if let Some(font) = current_font.as_mut() {
                    font.bold = attr(&e, b"val").map_or(true, |v| v != "0" && v != "false");
                }
            }
            (Section::Fonts, b"i") => {
                if let Some(font) = current_font.as_mut() {
                    font.italic = attr(&e, b"val").map_or(true, |v| v != "0" && v != "false");
                }
            }
            (Section::Fonts, b"sz") => {
                if let Some(font) = current_font.as_mut() {
                    if let Some(size) = attr(&e, b"val").and_then(|v| v.parse().ok()) {
                        font.size = size;
                    }
                }
            }
            (Section::Fonts, b"name") => {
                if let (Some(font), Some(name)) = (current_font.as_mut(), attr(&e, b"val")) {
                    font.name = name;
                }
            }
            (Section::Fonts, b"color") => {
                if let Some(font) = current_font.as_mut() {
                    font.color = parse_color(&e);
                }
            }

            (Section::Fills, b"fill") => {
                if empty {
                    fills.push(FillStyle::None);
                } else {
                    current_fill = Some((false, Color::Auto));
                }
            }
            (Section::Fills, b"patternFill") => {
                if let Some(fill) = current_fill.as_mut() {
                    fill.0 = attr(&e, b"patternType").as_deref() == Some("solid");
                }
            }
            (Section::Fills, b"fgColor") => {
                if let Some(fill) = current_fill.as_mut() {
                    fill.1 = parse_color(&e);
                }
            }

            (Section::Borders, b"border") => {
                if empty {
                    borders.push(BorderStyle::default());
                } else {
                    current_border = Some(BorderStyle::default());
                }
            }
            (Section::Borders, tag @ (b"left" | b"right" | b"top" | b"bottom")) => {
                let edge = match tag {
                    b"left" => Edge::Left,
                    b"right" => Edge::Right,
                    b"top" => Edge::Top,
                    _ => Edge::Bottom,
                };
                let style = attr(&e, b"style")
                    .map(|s| parse_border_style(&s))
                    .unwrap_or_default();
                if let Some(border) = current_border.as_mut() {
                    if style != BorderLineStyle::None {
                        *edge_mut(border, edge) = Some(BorderEdge {
                            style,
                            color: Color::Auto,
                        });
                    }
                }
                if !empty {
                    current_edge = Some(edge);
                }
            }
            (Section::Borders, b"color") => {
                if let (Some(border), Some(edge)) = (current_border.as_mut(), current_edge) {
                    if let Some(slot) = edge_mut(border, edge).as_mut() {
                        slot.color = parse_color(&e);
                    }
                }
            }

            (Section::CellXfs, b"xf") => {
                let id = |key: &[u8]| attr(&e, key).and_then(|v| v.parse().ok()).unwrap_or(0);
                let xf = PendingXf {
                    font_id: id(b"fontId"),
                    fill_id: id(b"fillId"),
                    border_id: id(b"borderId"),
                    alignment: Alignment::default(),
                };
                if empty {
                    cell_xfs.push(resolve_style(&xf, &fonts, &fills, &borders));
                } else {
                    current_xf = Some(xf);
                }
            }
            (Section::CellXfs, b"alignment") => {
                if let Some(xf) = current_xf.as_mut() {
                    xf.alignment = parse_alignment(&e);
                }
            }
            _ => {}
        }
        buf.clear();
    }

    if cell_xfs.is_empty() {
        cell_xfs.push(Style::default());
    }
    Ok(cell_xfs)
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}

fn parse_color(e: &BytesStart<'_>) -> Color {
    attr(e, b"rgb")
        .and_then(|hex| Color::from_hex(&hex))
        .unwrap_or_default()
}

fn finish_fill((solid, color): (bool, Color)) -> FillStyle {
    if solid {
        FillStyle::solid(color)
    } else {
        FillStyle::None
    }
}

fn parse_border_style(s: &str) -> BorderLineStyle {
    match s {
        "thin" | "hair" => BorderLineStyle::Thin,
        "medium" | "mediumDashed" | "mediumDashDot" | "mediumDashDotDot" => {
            BorderLineStyle::Medium
        }
        "thick" => BorderLineStyle::Thick,
        "dashed" | "dashDot" | "dashDotDot" | "slantDashDot" => BorderLineStyle::Dashed,
        "dotted" => BorderLineStyle::Dotted,
        "double" => BorderLineStyle::Double,
        _ => BorderLineStyle::None,
    }
}

fn parse_alignment(e: &BytesStart<'_>) -> Alignment {
    let horizontal = match attr(e, b"horizontal").as_deref() {
        Some("left") => HorizontalAlignment::Left,
        Some("center") | Some("centerContinuous") => HorizontalAlignment::Center,
        Some("right") => HorizontalAlignment::Right,
        _ => HorizontalAlignment::General,
    };
    let vertical = match attr(e, b"vertical").as_deref() {
        Some("top") => VerticalAlignment::Top,
        Some("center") => VerticalAlignment::Center,
        _ => VerticalAlignment::Bottom,
    };
    let wrap_text = matches!(attr(e, b"wrapText").as_deref(), Some("1") | Some("true"));
    Alignment {
        horizontal,
        vertical,
        wrap_text,
    }
}

fn edge_mut(border: &mut BorderStyle, edge: Edge) -> &mut Option<BorderEdge> {
    match edge {
        Edge::Left => &mut border.left,
        Edge::Right => &mut border.right,
        Edge::Top => &mut border.top,
        Edge::Bottom => &mut border.bottom,
    }
}

fn resolve_style(
    xf: &PendingXf,
    fonts: &[FontStyle],
    fills: &[FillStyle],
    borders: &[BorderStyle],
) -> Style {
    Style {
        font: fonts.get(xf.font_id).cloned().unwrap_or_default(),
        fill: fills.get(xf.fill_id).cloned().unwrap_or_default(),
        border: borders.get(xf.border_id).cloned().unwrap_or_default(),
        alignment: xf.alignment.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn failed_style() -> Style {
        Style::new()
            .font_name("Consolas")
            .fill_color(Color::RED)
            .border(BorderStyle::all(BorderLineStyle::Thin, Color::BLACK))
            .horizontal_alignment(HorizontalAlignment::Center)
            .vertical_alignment(VerticalAlignment::Center)
    }

    #[test]
    fn test_styles_xml_round_trip() {
        let mut workbook = Workbook::empty();
        workbook.ensure_sheet(0).unwrap();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value_at(0, 0, "plain").unwrap();
        sheet.set_cell_value_at(1, 0, "bad").unwrap();
        sheet.set_cell_style_at(1, 0, &failed_style()).unwrap();

        let table = XlsxStyleTable::build(&workbook);
        let xf = table.xf_id_for(0, workbook.worksheet(0).unwrap().cell_at(1, 0).unwrap().style_index);
        assert_eq!(xf, 1);

        let xml = table.to_styles_xml();
        let styles = read_styles_xml(xml.as_bytes()).unwrap();
        assert_eq!(styles.len(), 2);
        assert_eq!(styles[0], Style::default());
        assert_eq!(styles[1], failed_style());
    }

    #[test]
    fn test_missing_sections_fall_back_to_default() {
        let styles = read_styles_xml(&b"<styleSheet/>"[..]).unwrap();
        assert_eq!(styles, vec![Style::default()]);
    }
}
