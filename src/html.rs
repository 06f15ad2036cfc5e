use std::fmt::Write;

use crate::compose::{BIRTH_MARKER, BULLET, DEATH_MARKER, Document, ImagePage, PersonBlock, Summary};

const STYLE: &str = r#"
      body {
        font-family: sans-serif;
      }
      @media print {
        @page {
          size: A4 portrait;
        }
      }
      .imageRotate {
        transform: rotate(90deg);
        transform-origin: top left;
      }
      .imgContainer {
        display: block;
        margin-left: auto;
        margin-right: auto;
        margin-top: auto;
        margin-bottom: auto;
      }
      .note {
        margin-left: auto;
        margin-right: auto;
        margin-top: 0.5cm;
        width: fit-content;
        font-size: 80%;
      }
      .marker {
        width: 2em;
        display: inline-block;
        text-align: center;
      }
"#;

/// Escape markup characters and write everything outside ASCII as a numeric
/// character reference, so the output is plain ASCII.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c if c.is_ascii() => out.push(c),
            c => {
                let _ = write!(out, "&#{};", c as u32);
            }
        }
    }
    out
}

fn marker(c: char) -> String {
    format!(r#"<div class="marker">{}</div>"#, escape(&c.to_string()))
}

fn summary_html(summary: &Summary) -> String {
    let mut out = escape(&summary.name);
    if let Some(serial) = summary.serial {
        let _ = write!(out, "<sup>{serial}</sup>");
    }
    if let Some(lifespan) = summary.lifespan() {
        let _ = write!(out, " {}", escape(&lifespan));
    }
    out
}

fn bullet_list(items: impl Iterator<Item = String>) -> String {
    items
        .map(|item| format!("{}{item}", marker(BULLET)))
        .collect::<Vec<_>>()
        .join("<br/>")
}

fn person_html(doc: &Document, person: &PersonBlock) -> String {
    let mut info: Vec<String> = Vec::new();
    if let Some(birth) = &person.summary.birth {
        info.push(format!("{}{}", marker(BIRTH_MARKER), escape(birth)));
    }
    if let Some(death) = &person.summary.death {
        info.push(format!("{}{}", marker(DEATH_MARKER), escape(death)));
    }
    if !person.parents.is_empty() {
        info.push(format!(
            "<h4>{}</h4>{}",
            escape(doc.labels.parents),
            bullet_list(person.parents.iter().map(summary_html))
        ));
    }
    if !person.children.is_empty() {
        info.push(format!(
            "<h4>{}</h4>{}",
            escape(doc.labels.children),
            bullet_list(person.children.iter().map(summary_html))
        ));
    }
    if !person.images.is_empty() {
        info.push(format!(
            "<h4>{}</h4>{}",
            escape(doc.labels.images),
            bullet_list(
                person
                    .images
                    .iter()
                    .map(|i| format!("{}: {}", i.serial, escape(&i.title)))
            )
        ));
    }
    format!(
        "<div><h2>{}</h2>{}</div>\n",
        summary_html(&person.summary),
        info.join("<br/>")
    )
}

fn image_html(page: &ImagePage) -> String {
    let p = &page.placement;
    let (class, img_style) = if p.rotated {
        (
            "imageRotate",
            format!(
                "width: {h}cm; height: {w}cm; margin-left: {w}cm;",
                w = p.width,
                h = p.height
            ),
        )
    } else {
        (
            "imagePlain",
            format!("width: {}cm; height: {}cm;", p.width, p.height),
        )
    };
    let note = escape(&page.note).replace('\n', "<br/>");
    format!(
        r#"
      <h2 style="page-break-before: always; text-align: center;">{serial}: {title}</h2>
      <div class="imgContainer" style="width: {width}cm; height: {height}cm;">
        <img class="{class}" src="file:{path}" style="{img_style}"/>
      </div>
      <div class="note">{note}</div>
"#,
        serial = page.serial,
        title = escape(&page.title),
        width = p.width,
        height = p.height,
        path = escape(&page.path.to_string_lossy()),
    )
}

/// Render the composed document as a standalone HTML page.
pub fn to_html(doc: &Document) -> String {
    let people: String = doc.people.iter().map(|p| person_html(doc, p)).collect();
    let images: String = doc.image_pages.iter().map(image_html).collect();
    format!(
        r#"
<html>
  <head>
    <meta charset="UTF-8"/>
    <style>{STYLE}    </style>
  </head>
  <body>
    {people}
    {images}
  </body>
</html>
"#
    )
}
