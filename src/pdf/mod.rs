mod flow;

use std::path::Path;

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref};

use crate::compose::{BULLET, Document, ImagePage, PersonBlock, Summary};
use crate::error::Error;
use crate::fonts::{StandardFont, register_helvetica};
use crate::layout::{A4_HEIGHT_CM, A4_WIDTH_CM, cm_to_pt};

use flow::{Align, PageFlow, Span};

const MARGIN_CM: f32 = 2.0;
const HEADING_SIZE: f32 = 16.0;
const SUBHEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 11.0;
const NOTE_SIZE: f32 = BODY_SIZE * 0.8;
const MARKER_INDENT: f32 = 22.0;

// ★ and ✝ are not in WinAnsi; these are the usual genealogical stand-ins.
const BIRTH_TEXT: &str = "*";
const DEATH_TEXT: &str = "\u{2020}";

struct Fonts {
    regular: StandardFont,
    bold: StandardFont,
}

struct EmbeddedImage {
    pdf_name: String,
    xobj_ref: Ref,
}

fn image_error(path: &Path, reason: impl ToString) -> Error {
    Error::Render(format!("{}: {}", path.display(), reason.to_string()))
}

/// Write one image file as an XObject. RGB and grayscale JPEGs are passed
/// through; everything else is decoded and stored Flate-compressed.
fn embed_image(
    pdf: &mut Pdf,
    path: &Path,
    alloc: &mut impl FnMut() -> Ref,
) -> Result<Ref, Error> {
    let data = std::fs::read(path)?;
    let decoded = image::load_from_memory(&data).map_err(|e| image_error(path, e))?;
    let (w, h) = (decoded.width() as i32, decoded.height() as i32);
    let is_jpeg = data.starts_with(&[0xFF, 0xD8]);
    let xobj_ref = alloc();

    match decoded.color() {
        image::ColorType::Rgb8 if is_jpeg => {
            let mut xobj = pdf.image_xobject(xobj_ref, &data);
            xobj.filter(Filter::DctDecode);
            xobj.width(w);
            xobj.height(h);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
        }
        image::ColorType::L8 if is_jpeg => {
            let mut xobj = pdf.image_xobject(xobj_ref, &data);
            xobj.filter(Filter::DctDecode);
            xobj.width(w);
            xobj.height(h);
            xobj.color_space().device_gray();
            xobj.bits_per_component(8);
        }
        _ => {
            let rgba: image::RgbaImage = decoded.to_rgba8();
            let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);
            let rgb_data: Vec<u8> = rgba
                .pixels()
                .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                .collect();
            let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

            let smask_ref = if has_alpha {
                let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
                let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6);
                let mask_ref = alloc();
                let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(w);
                mask.height(h);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                Some(mask_ref)
            } else {
                None
            };

            let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w);
            xobj.height(h);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_ref) = smask_ref {
                xobj.s_mask(mask_ref);
            }
        }
    }
    Ok(xobj_ref)
}

fn summary_spans<'a>(summary: &Summary, font: &'a StandardFont, size: f32) -> Vec<Span<'a>> {
    let mut spans = vec![Span::plain(summary.name.clone(), font, size)];
    if let Some(serial) = summary.serial {
        spans.push(Span::superscript(serial.to_string(), font, size));
    }
    if let Some(lifespan) = summary.lifespan() {
        spans.push(Span::plain(format!(" {lifespan}"), font, size));
    }
    spans
}

fn render_person(flow: &mut PageFlow, fonts: &Fonts, doc: &Document, person: &PersonBlock) {
    flow.line(&summary_spans(&person.summary, &fonts.bold, HEADING_SIZE), 0.0, Align::Left);

    let markers = [
        (BIRTH_TEXT, &person.summary.birth),
        (DEATH_TEXT, &person.summary.death),
    ];
    for (marker, date) in markers {
        if let Some(date) = date {
            flow.line(
                &[
                    Span::plain(marker, &fonts.regular, BODY_SIZE),
                    Span::plain(format!("  {date}"), &fonts.regular, BODY_SIZE),
                ],
                0.0,
                Align::Left,
            );
        }
    }

    let relations = [
        (doc.labels.parents, &person.parents),
        (doc.labels.children, &person.children),
    ];
    for (label, people) in relations {
        if people.is_empty() {
            continue;
        }
        flow.skip(BODY_SIZE * 0.4);
        flow.line(&[Span::plain(label, &fonts.bold, SUBHEADING_SIZE)], 0.0, Align::Left);
        for summary in people {
            let mut spans = vec![Span::plain(format!("{BULLET}  "), &fonts.regular, BODY_SIZE)];
            spans.extend(summary_spans(summary, &fonts.regular, BODY_SIZE));
            flow.line(&spans, MARKER_INDENT / 2.0, Align::Left);
        }
    }

    if !person.images.is_empty() {
        flow.skip(BODY_SIZE * 0.4);
        flow.line(&[Span::plain(doc.labels.images, &fonts.bold, SUBHEADING_SIZE)], 0.0, Align::Left);
        for image in &person.images {
            flow.paragraph(
                &format!("{BULLET}  {}: {}", image.serial, image.title),
                &fonts.regular,
                BODY_SIZE,
                MARKER_INDENT / 2.0,
                Align::Left,
            );
        }
    }
    flow.skip(BODY_SIZE * 1.5);
}

fn heading_text(page: &ImagePage) -> String {
    format!("{}: {}", page.serial, page.title)
}

/// Title, image and note on a fresh page. The image box is centered and sized
/// by the placement (cm); a rotated image is drawn turned clockwise.
fn render_image_page(flow: &mut PageFlow, fonts: &Fonts, page: &ImagePage, image: Option<&EmbeddedImage>) {
    flow.new_page();
    flow.paragraph(
        &heading_text(page),
        &fonts.bold,
        HEADING_SIZE,
        0.0,
        Align::Center,
    );
    flow.skip(cm_to_pt(0.5));

    let bw = cm_to_pt(page.placement.width);
    let bh = cm_to_pt(page.placement.height);
    let x = (flow.page_width - bw) / 2.0;
    let y_bottom = flow.y - bh;
    if let Some(image) = image {
        let matrix = if page.placement.rotated {
            [0.0, -bh, bw, 0.0, x, y_bottom + bh]
        } else {
            [bw, 0.0, 0.0, bh, x, y_bottom]
        };
        let content: &mut Content = flow.content();
        content.save_state();
        content.transform(matrix);
        content.x_object(Name(image.pdf_name.as_bytes()));
        content.restore_state();
    }
    flow.skip(bh + cm_to_pt(0.5));
    flow.paragraph(&page.note, &fonts.regular, NOTE_SIZE, 0.0, Align::Center);
}

/// Render the composed document as an A4 PDF: person blocks flowing from the
/// first page, then one page per image.
pub fn render(doc: &Document) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();

    let fonts = Fonts {
        regular: register_helvetica(&mut pdf, alloc(), "F1", false),
        bold: register_helvetica(&mut pdf, alloc(), "F2", true),
    };

    // Phase 1: embed images
    let mut embedded: Vec<Option<EmbeddedImage>> = Vec::with_capacity(doc.image_pages.len());
    for page in &doc.image_pages {
        match embed_image(&mut pdf, &page.path, &mut alloc) {
            Ok(xobj_ref) => embedded.push(Some(EmbeddedImage {
                pdf_name: format!("Im{}", page.serial),
                xobj_ref,
            })),
            Err(e) => {
                log::warn!("Image {} ({}) left out of the PDF: {e}", page.serial, page.title);
                embedded.push(None);
            }
        }
    }
    let t_images = t0.elapsed();

    // Phase 2: lay out pages
    let mut flow = PageFlow::new(
        cm_to_pt(A4_WIDTH_CM),
        cm_to_pt(A4_HEIGHT_CM),
        cm_to_pt(MARGIN_CM),
    );
    for person in &doc.people {
        render_person(&mut flow, &fonts, doc, person);
    }
    for (page, image) in doc.image_pages.iter().zip(&embedded) {
        render_image_page(&mut flow, &fonts, page, image.as_ref());
    }
    let (page_width, page_height) = (flow.page_width, flow.page_height);
    let contents = flow.finish();
    let t_layout = t0.elapsed();

    // Phase 3: assemble page tree
    let n = contents.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, c) in contents.into_iter().enumerate() {
        let raw = c.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    let xobjects: Vec<&EmbeddedImage> = embedded.iter().flatten().collect();
    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, page_width, page_height))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut font_dict = resources.fonts();
            for font in [&fonts.regular, &fonts.bold] {
                font_dict.pair(Name(font.pdf_name.as_bytes()), font.font_ref);
            }
        }
        if !xobjects.is_empty() {
            let mut xobj_dict = resources.x_objects();
            for image in &xobjects {
                xobj_dict.pair(Name(image.pdf_name.as_bytes()), image.xobj_ref);
            }
        }
    }

    let bytes = pdf.finish();
    log::info!(
        "Render phases: images={:.1}ms, layout={:.1}ms, assembly={:.1}ms ({} pages, {} bytes)",
        t_images.as_secs_f64() * 1000.0,
        (t_layout - t_images).as_secs_f64() * 1000.0,
        (t0.elapsed() - t_layout).as_secs_f64() * 1000.0,
        n,
        bytes.len(),
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::place_on_a4;

    fn page_with_title(title: &str) -> ImagePage {
        ImagePage {
            serial: 4,
            title: title.to_string(),
            path: "/photos/x.png".into(),
            placement: place_on_a4(100, 200).unwrap(),
            note: "Note".to_string(),
        }
    }

    fn y_after(pdf: &mut Pdf, page: &ImagePage) -> f32 {
        let fonts = Fonts {
            regular: register_helvetica(pdf, Ref::new(1), "F1", false),
            bold: register_helvetica(pdf, Ref::new(2), "F2", true),
        };
        let mut flow = PageFlow::new(
            cm_to_pt(A4_WIDTH_CM),
            cm_to_pt(A4_HEIGHT_CM),
            cm_to_pt(MARGIN_CM),
        );
        render_image_page(&mut flow, &fonts, page, None);
        flow.y
    }

    #[test]
    fn long_image_title_wraps_within_margins() {
        let title = "Familien samlet i haven bag gaarden i Odense ved sommerfesten i anledning af bedstefars halvfjerdsaars fodselsdag";
        let page = page_with_title(title);

        let mut pdf = Pdf::new();
        let bold = register_helvetica(&mut pdf, Ref::new(3), "F3", true);
        let width = cm_to_pt(A4_WIDTH_CM - 2.0 * MARGIN_CM);
        let lines = flow::wrap_text(&heading_text(&page), &bold, HEADING_SIZE, width);
        assert!(lines.len() > 1, "{lines:?}");
        for line in &lines {
            assert!(bold.text_width(line, HEADING_SIZE) <= width, "{line}");
        }

        let short = y_after(&mut Pdf::new(), &page_with_title("Kort"));
        let long = y_after(&mut Pdf::new(), &page);
        assert!(long < short);
    }
}
