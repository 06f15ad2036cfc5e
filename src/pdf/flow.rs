use pdf_writer::{Content, Name, Str};

use crate::fonts::{StandardFont, to_winansi_bytes};

pub(super) struct Span<'a> {
    pub(super) text: String,
    pub(super) font: &'a StandardFont,
    pub(super) font_size: f32,
    /// Baseline shift, for superscripts.
    pub(super) rise: f32,
}

impl<'a> Span<'a> {
    pub(super) fn plain(text: impl Into<String>, font: &'a StandardFont, font_size: f32) -> Self {
        Span {
            text: text.into(),
            font,
            font_size,
            rise: 0.0,
        }
    }

    /// Superscript relative to a run of `font_size`.
    pub(super) fn superscript(text: impl Into<String>, font: &'a StandardFont, font_size: f32) -> Self {
        Span {
            text: text.into(),
            font,
            font_size: font_size * 0.58,
            rise: font_size * 0.35,
        }
    }

    fn width(&self) -> f32 {
        self.font.text_width(&self.text, self.font_size)
    }
}

#[derive(Clone, Copy, PartialEq)]
pub(super) enum Align {
    Left,
    Center,
}

/// Greedy word wrap. Explicit line breaks always start a new line.
pub(super) fn wrap_text(text: &str, font: &StandardFont, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if font.text_width(&candidate, font_size) > max_width {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}

/// Top-to-bottom text flow over A4 pages with automatic page breaks.
pub(super) struct PageFlow {
    pub(super) page_width: f32,
    pub(super) page_height: f32,
    pub(super) margin: f32,
    pages: Vec<Content>,
    current: Content,
    dirty: bool,
    pub(super) y: f32,
}

impl PageFlow {
    pub(super) fn new(page_width: f32, page_height: f32, margin: f32) -> Self {
        PageFlow {
            page_width,
            page_height,
            margin,
            pages: Vec::new(),
            current: Content::new(),
            dirty: false,
            y: page_height - margin,
        }
    }

    pub(super) fn text_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    /// Start a new page unless the current one is still empty.
    pub(super) fn new_page(&mut self) {
        if self.dirty {
            let done = std::mem::replace(&mut self.current, Content::new());
            self.pages.push(done);
            self.dirty = false;
        }
        self.y = self.page_height - self.margin;
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < self.margin {
            self.new_page();
        }
    }

    pub(super) fn skip(&mut self, height: f32) {
        self.y -= height;
    }

    pub(super) fn content(&mut self) -> &mut Content {
        self.dirty = true;
        &mut self.current
    }

    /// One line made of spans, starting `indent` points from the left margin.
    pub(super) fn line(&mut self, spans: &[Span], indent: f32, align: Align) {
        let size = spans.iter().map(|s| s.font_size + s.rise).fold(0.0f32, f32::max);
        let line_h = size * 1.25;
        self.ensure(line_h);
        let baseline = self.y - size;
        let total: f32 = spans.iter().map(Span::width).sum();
        let mut x = match align {
            Align::Left => self.margin + indent,
            Align::Center => (self.page_width - total) / 2.0,
        };
        let content = self.content();
        for span in spans {
            if span.text.is_empty() {
                continue;
            }
            content.begin_text();
            content.set_font(Name(span.font.pdf_name.as_bytes()), span.font_size);
            content.next_line(x, baseline + span.rise);
            content.show(Str(&to_winansi_bytes(&span.text)));
            content.end_text();
            x += span.width();
        }
        self.y -= line_h;
    }

    /// Wrapped paragraph in a single font.
    pub(super) fn paragraph(
        &mut self,
        text: &str,
        font: &StandardFont,
        font_size: f32,
        indent: f32,
        align: Align,
    ) {
        let width = self.text_width() - indent;
        for line in wrap_text(text, font, font_size, width) {
            self.line(&[Span::plain(line, font, font_size)], indent, align);
        }
    }

    pub(super) fn finish(mut self) -> Vec<Content> {
        if self.dirty || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}
