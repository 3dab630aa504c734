//! EPUB exporter.
//!
//! Builds the full file set of an EPUB 3 package (with EPUB 2 NCX and guide
//! for older readers) from a [`PackageInput`].

use std::io::{Seek, Write};
use std::sync::Arc;

use tracing::debug;

use crate::book::{ImageType, PackageChapter, PackageInput};
use crate::error::{Error, Result};
use crate::provider::{Clock, IdentifierSource, SystemClock, UuidSource, modified_stamp};
use crate::util::{chapter_body_xhtml, escape_xml};

use super::Exporter;
use super::archive::{
    Archive, Compression, EPUB_MIME, MIMETYPE_PATH, Package, serialize, write_archive,
};

/// Configuration for EPUB export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpubConfig {
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<u32>,
    /// Embed the cover image. When false the title page is still written.
    pub include_cover: bool,
}

impl Default for EpubConfig {
    fn default() -> Self {
        Self {
            compression_level: None,
            include_cover: true,
        }
    }
}

/// EPUB format exporter.
///
/// # Example
///
/// ```
/// use bindery::PackageInput;
/// use bindery::export::EpubExporter;
///
/// let input = PackageInput::new("My Book")
///     .with_creator("Me")
///     .with_chapter("Opening", "<p>It begins.</p>");
/// let package = EpubExporter::new().package(&input)?;
/// assert_eq!(package.content_type, "application/epub+zip");
/// # Ok::<(), bindery::Error>(())
/// ```
#[derive(Clone)]
pub struct EpubExporter {
    config: EpubConfig,
    clock: Arc<dyn Clock>,
    identifiers: Arc<dyn IdentifierSource>,
}

impl EpubExporter {
    /// Create a new exporter with default configuration.
    pub fn new() -> Self {
        Self {
            config: EpubConfig::default(),
            clock: Arc::new(SystemClock),
            identifiers: Arc::new(UuidSource),
        }
    }

    /// Configure the exporter with custom settings.
    pub fn with_config(mut self, config: EpubConfig) -> Self {
        self.config = config;
        self
    }

    /// Clock used when the input carries no modification stamp.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Identifier source used when the input's identifier is blank.
    pub fn with_identifiers(mut self, identifiers: impl IdentifierSource + 'static) -> Self {
        self.identifiers = Arc::new(identifiers);
        self
    }

    pub fn config(&self) -> &EpubConfig {
        &self.config
    }

    /// Build the package file set.
    pub fn build(&self, input: &PackageInput) -> Result<Archive> {
        if input.chapters.is_empty() {
            return Err(Error::Packaging("an EPUB needs at least one chapter".into()));
        }

        let cover = match &input.cover_image {
            Some(image) if self.config.include_cover => {
                let kind = ImageType::from_mime(&image.mime_type).ok_or_else(|| {
                    Error::Packaging(format!(
                        "unrecognized cover image type '{}'",
                        image.mime_type
                    ))
                })?;
                Some(CoverItem {
                    href: format!("images/cover.{}", kind.extension()),
                    media_type: kind.mime_type(),
                    data: &image.bytes,
                })
            }
            _ => None,
        };

        // One identifier per build, shared by content.opf and toc.ncx.
        let identifier = if input.identifier.trim().is_empty() {
            self.identifiers.new_identifier()
        } else {
            input.identifier.clone()
        };
        let modified = if input.modified.trim().is_empty() {
            modified_stamp(self.clock.now())
        } else {
            input.modified.clone()
        };

        let chapters = input.sorted_chapters();
        let mut archive = Archive::new();

        // 1. mimetype (must be first, uncompressed)
        archive.push(MIMETYPE_PATH, EPUB_MIME, Compression::Stored);

        // 2. container.xml
        archive.push("META-INF/container.xml", CONTAINER_XML, Compression::Deflated);

        // 3. stylesheet
        archive.push("OEBPS/stylesheet.css", STYLESHEET_CSS, Compression::Deflated);

        // 4. cover image, verbatim
        if let Some(cover) = &cover {
            archive.push(
                format!("OEBPS/{}", cover.href),
                cover.data.to_vec(),
                Compression::Deflated,
            );
        }

        // 5. title page
        let title_page = generate_title_page(input, cover.as_ref().map(|c| c.href.as_str()));
        archive.push("OEBPS/title.xhtml", title_page, Compression::Deflated);

        // 6. chapters, numbered by reading order
        for (i, chapter) in chapters.iter().enumerate() {
            let document = generate_chapter(chapter, &input.language);
            archive.push(
                format!("OEBPS/{}", chapter_href(i + 1)),
                document,
                Compression::Deflated,
            );
        }

        // 7. nav.xhtml
        archive.push(
            "OEBPS/nav.xhtml",
            generate_nav(&input.language, &chapters),
            Compression::Deflated,
        );

        // 8. content.opf
        let opf = generate_opf(input, &identifier, &modified, &chapters, cover.as_ref());
        archive.push("OEBPS/content.opf", opf, Compression::Deflated);

        // 9. toc.ncx
        let ncx = generate_ncx(input, &identifier, &chapters);
        archive.push("OEBPS/toc.ncx", ncx, Compression::Deflated);

        debug!(
            title = %input.title,
            chapters = chapters.len(),
            cover = cover.is_some(),
            entries = archive.len(),
            "built EPUB file set"
        );
        Ok(archive)
    }

    /// Build and serialize in one step.
    pub fn package(&self, input: &PackageInput) -> Result<Package> {
        let archive = self.build(input)?;
        serialize(&archive, self.config.compression_level)
    }
}

impl Default for EpubExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter for EpubExporter {
    fn export<W: Write + Seek>(&self, input: &PackageInput, writer: &mut W) -> Result<()> {
        let archive = self.build(input)?;
        write_archive(&archive, writer, self.config.compression_level)
    }
}

struct CoverItem<'a> {
    href: String,
    media_type: &'static str,
    data: &'a [u8],
}

fn chapter_href(number: usize) -> String {
    format!("chapter{}.xhtml", number)
}

/// Container.xml template.
const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// Shared stylesheet; identical for every book.
const STYLESHEET_CSS: &str = r#"body {
  font-family: serif;
  margin: 5%;
  text-align: justify;
}
h1, h2, h3, h4 {
  text-align: center;
  font-family: sans-serif;
}
.title {
  font-size: 2em;
  margin-bottom: 0;
}
.author {
  font-size: 1.5em;
  margin-top: 0;
  margin-bottom: 2em;
}
.chapter {
  margin-top: 2em;
}
.cover {
  text-align: center;
  margin: 0;
  padding: 0;
}
.cover img {
  max-width: 100%;
  max-height: 100%;
}
nav ol {
  list-style-type: none;
}
nav a {
  text-decoration: none;
  color: #0000EE;
}
"#;

/// Open an XHTML document up to and including `<body>`.
fn xhtml_head(out: &mut String, language: &str, title: &str) {
    let lang = escape_xml(language);
    out.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{lang}" lang="{lang}">
<head>
  <title>{}</title>
  <link rel="stylesheet" type="text/css" href="stylesheet.css"/>
</head>
<body>
"#,
        escape_xml(title)
    ));
}

fn generate_title_page(input: &PackageInput, cover_href: Option<&str>) -> String {
    let mut page = String::new();
    xhtml_head(&mut page, &input.language, &input.title);
    if let Some(href) = cover_href {
        page.push_str(&format!(
            "  <div class=\"cover\"><img src=\"{}\" alt=\"Cover\"/></div>\n",
            escape_xml(href)
        ));
    }
    page.push_str(&format!(
        "  <h1 class=\"title\">{}</h1>\n",
        escape_xml(&input.title)
    ));
    page.push_str(&format!(
        "  <h2 class=\"author\">{}</h2>\n",
        escape_xml(&input.creator)
    ));
    page.push_str("</body>\n</html>\n");
    page
}

fn generate_chapter(chapter: &PackageChapter, language: &str) -> String {
    let mut doc = String::new();
    xhtml_head(&mut doc, language, &chapter.title);
    doc.push_str(&format!(
        "  <h2 class=\"chapter\">{}</h2>\n",
        escape_xml(&chapter.title)
    ));
    doc.push_str("  <div>");
    doc.push_str(&chapter_body_xhtml(&chapter.body));
    doc.push_str("</div>\n</body>\n</html>\n");
    doc
}

fn generate_nav(language: &str, chapters: &[&PackageChapter]) -> String {
    let mut nav = String::new();
    xhtml_head(&mut nav, language, "Navigation");
    nav.push_str(
        r#"  <nav epub:type="toc" id="toc">
    <h1>Table of Contents</h1>
    <ol>
      <li><a href="title.xhtml">Title Page</a></li>
"#,
    );
    for (i, chapter) in chapters.iter().enumerate() {
        nav.push_str(&format!(
            "      <li><a href=\"{}\">{}</a></li>\n",
            chapter_href(i + 1),
            escape_xml(&chapter.title)
        ));
    }
    nav.push_str("    </ol>\n  </nav>\n</body>\n</html>\n");
    nav
}

/// Generate content.opf.
fn generate_opf(
    input: &PackageInput,
    identifier: &str,
    modified: &str,
    chapters: &[&PackageChapter],
    cover: Option<&CoverItem<'_>>,
) -> String {
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );

    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(identifier)
    ));
    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_xml(&input.title)
    ));
    opf.push_str(&format!(
        "    <dc:creator>{}</dc:creator>\n",
        escape_xml(&input.creator)
    ));
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_xml(&input.language)
    ));

    // Optional Dublin Core fields are only written when set
    let optional = [
        ("dc:date", &input.date),
        ("dc:description", &input.description),
    ];
    for (tag, value) in optional {
        if !value.trim().is_empty() {
            opf.push_str(&format!("    <{tag}>{}</{tag}>\n", escape_xml(value)));
        }
    }
    // A secondary ISBN that repeats the primary identifier is skipped
    if !input.isbn.trim().is_empty() && input.isbn.trim() != identifier.trim() {
        opf.push_str(&format!(
            "    <dc:identifier id=\"ISBN\">{}</dc:identifier>\n",
            escape_xml(&input.isbn)
        ));
    }
    let optional = [
        ("dc:subject", &input.subject),
        ("dc:publisher", &input.publisher),
        ("dc:rights", &input.rights),
    ];
    for (tag, value) in optional {
        if !value.trim().is_empty() {
            opf.push_str(&format!("    <{tag}>{}</{tag}>\n", escape_xml(value)));
        }
    }

    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}</meta>\n",
        escape_xml(modified)
    ));
    if cover.is_some() {
        opf.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
    }
    opf.push_str("  </metadata>\n");

    // Manifest
    opf.push_str("  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    opf.push_str(
        "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
    );
    opf.push_str("    <item id=\"stylesheet\" href=\"stylesheet.css\" media-type=\"text/css\"/>\n");
    opf.push_str(
        "    <item id=\"title\" href=\"title.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
    );
    for i in 1..=chapters.len() {
        opf.push_str(&format!(
            "    <item id=\"chapter{i}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            chapter_href(i)
        ));
    }
    if let Some(cover) = cover {
        opf.push_str(&format!(
            "    <item id=\"cover-image\" href=\"{}\" media-type=\"{}\" properties=\"cover-image\"/>\n",
            escape_xml(&cover.href),
            cover.media_type
        ));
    }
    opf.push_str("  </manifest>\n");

    // Spine: title page, chapters, then the nav document
    opf.push_str("  <spine toc=\"ncx\">\n");
    opf.push_str("    <itemref idref=\"title\"/>\n");
    for i in 1..=chapters.len() {
        opf.push_str(&format!("    <itemref idref=\"chapter{i}\"/>\n"));
    }
    opf.push_str("    <itemref idref=\"nav\"/>\n");
    opf.push_str("  </spine>\n");

    opf.push_str(
        r#"  <guide>
    <reference type="cover" title="Cover" href="title.xhtml"/>
    <reference type="toc" title="Table of Contents" href="nav.xhtml"/>
  </guide>
</package>
"#,
    );
    opf
}

/// Generate toc.ncx.
fn generate_ncx(input: &PackageInput, identifier: &str, chapters: &[&PackageChapter]) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content=""#,
    );
    ncx.push_str(&escape_xml(identifier));
    ncx.push_str(
        r#""/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
    );
    ncx.push_str(&escape_xml(&input.title));
    ncx.push_str(
        r#"</text>
  </docTitle>
  <docAuthor>
    <text>"#,
    );
    ncx.push_str(&escape_xml(&input.creator));
    ncx.push_str(
        r#"</text>
  </docAuthor>
  <navMap>
"#,
    );

    write_nav_point(&mut ncx, 1, "Title Page", "title.xhtml");
    for (i, chapter) in chapters.iter().enumerate() {
        write_nav_point(&mut ncx, i + 2, &chapter.title, &chapter_href(i + 1));
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

fn write_nav_point(ncx: &mut String, play_order: usize, label: &str, src: &str) {
    ncx.push_str(&format!(
        "    <navPoint id=\"navpoint-{play_order}\" playOrder=\"{play_order}\">\n"
    ));
    ncx.push_str(&format!(
        "      <navLabel><text>{}</text></navLabel>\n",
        escape_xml(label)
    ));
    ncx.push_str(&format!("      <content src=\"{}\"/>\n", escape_xml(src)));
    ncx.push_str("    </navPoint>\n");
}
