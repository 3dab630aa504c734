//! Property tests for chapter ordering and text escaping in generated packages.

use bindery::provider::{FixedClock, FixedIdentifier};
use bindery::{EpubExporter, PackageChapter, PackageInput};
use proptest::prelude::*;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::Event;

fn exporter() -> EpubExporter {
    EpubExporter::new()
        .with_clock(FixedClock::parse("2024-01-01T00:00:00Z").unwrap())
        .with_identifiers(FixedIdentifier("urn:uuid:prop".into()))
}

fn between<'a>(haystack: &'a str, start: &str, end: &str) -> &'a str {
    let from = haystack.find(start).unwrap() + start.len();
    let to = haystack[from..].find(end).unwrap() + from;
    &haystack[from..to]
}

fn is_well_formed(doc: &str) -> bool {
    let mut reader = Reader::from_str(doc);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
}

fn chapter_heading(archive: &bindery::export::Archive, number: usize) -> String {
    let doc = archive
        .text(&format!("OEBPS/chapter{number}.xhtml"))
        .unwrap();
    between(doc, "<h2 class=\"chapter\">", "</h2>").to_string()
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            prop::char::range(' ', '~'),
            Just('&'),
            Just('<'),
            Just('>'),
            Just('"'),
            Just('\''),
            Just('é'),
            Just('漢'),
        ],
        1..24,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn prop_chapters_follow_stable_order(orders in prop::collection::vec(-3i64..4, 1..8)) {
        let mut input = PackageInput::new("Props");
        input.chapters = orders
            .iter()
            .enumerate()
            .map(|(i, &order)| PackageChapter::new(format!("chapter-{i}"), "", order))
            .collect();

        let mut expected: Vec<(usize, i64)> = orders.iter().copied().enumerate().collect();
        expected.sort_by_key(|&(_, order)| order);

        let archive = exporter().build(&input).unwrap();
        for (number, (source_index, _)) in expected.iter().enumerate() {
            prop_assert_eq!(chapter_heading(&archive, number + 1), format!("chapter-{source_index}"));
        }
        let past_end = format!("OEBPS/chapter{}.xhtml", orders.len() + 1);
        prop_assert!(archive.get(&past_end).is_none(), "unexpected extra chapter {}", past_end);

        // Feeding the sorted result back in changes nothing
        let mut resorted = input.clone();
        resorted.chapters = input.sorted_chapters().into_iter().cloned().collect();
        prop_assert_eq!(exporter().build(&resorted).unwrap(), archive);
    }

    #[test]
    fn prop_metadata_text_survives_escaping(
        title in text_strategy(),
        creator in text_strategy(),
        chapter_title in text_strategy(),
    ) {
        let input = PackageInput::new(title.clone())
            .with_creator(creator.clone())
            .with_chapter(chapter_title.clone(), "body text");
        let archive = exporter().build(&input).unwrap();

        for path in [
            "META-INF/container.xml",
            "OEBPS/title.xhtml",
            "OEBPS/chapter1.xhtml",
            "OEBPS/nav.xhtml",
            "OEBPS/content.opf",
            "OEBPS/toc.ncx",
        ] {
            let doc = archive.text(path).unwrap();
            prop_assert!(is_well_formed(doc), "{} is not well-formed:\n{}", path, doc);
        }

        let opf = archive.text("OEBPS/content.opf").unwrap();
        let raw_title = between(opf, "<dc:title>", "</dc:title>");
        prop_assert!(!raw_title.contains('<'));
        prop_assert_eq!(unescape(raw_title).unwrap(), title.as_str());
        let raw_creator = between(opf, "<dc:creator>", "</dc:creator>");
        prop_assert_eq!(unescape(raw_creator).unwrap(), creator.as_str());

        let heading = chapter_heading(&archive, 1);
        prop_assert_eq!(unescape(&heading).unwrap(), chapter_title.as_str());
    }

    #[test]
    fn prop_any_chapter_body_is_well_formed(
        lines in prop::collection::vec(
            prop_oneof![
                text_strategy(),
                Just("<p>para</p>".to_string()),
                Just("<em>open".to_string()),
                Just("</b>".to_string()),
                Just("a&nbsp;b".to_string()),
                Just("if x<y then".to_string()),
                Just("ctl\u{1}char".to_string()),
            ],
            1..6,
        )
    ) {
        let body = lines.join("\n");
        let input = PackageInput::new("Bodies").with_chapter("c", body.clone());
        let archive = exporter().build(&input).unwrap();
        let doc = archive.text("OEBPS/chapter1.xhtml").unwrap();
        prop_assert!(is_well_formed(doc), "chapter is not well-formed for {:?}:\n{}", body, doc);
        prop_assert!(!doc.contains('\u{1}'), "document contains U+0001");
    }
}
