//! Sitemap discovery and parsing
//!
//! Handles robots.txt `Sitemap:` lines, gzip-compressed payloads, and both
//! `<urlset>` and `<sitemapindex>` documents with or without namespaces.

use crate::product::text::{dedupe_keep_order, normalize_space};
use flate2::read::GzDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Errors from decoding or parsing a sitemap payload
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("gzip decode failed: {0}")]
    Gzip(#[from] std::io::Error),

    #[error("XML parse failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document has no root element")]
    Empty,

    #[error("document ended with {0} unclosed element(s)")]
    Truncated(usize),
}

/// Returns true if a `<loc>` points at another sitemap rather than a page
pub fn is_nested_sitemap(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    lowered.ends_with(".xml") || lowered.ends_with(".xml.gz")
}

/// Returns true if a sitemap candidate is a robots.txt file
pub fn is_robots_url(url: &str) -> bool {
    url.to_ascii_lowercase().ends_with("robots.txt")
}

/// Sitemap URLs declared in a robots.txt body
///
/// Matches lines starting with `Sitemap:` in any case; duplicates are dropped.
pub fn sitemaps_from_robots(robots_txt: &str) -> Vec<String> {
    let urls = robots_txt.lines().filter_map(|line| {
        let line = line.trim();
        let (directive, value) = line.split_once(':')?;
        if !directive.trim().eq_ignore_ascii_case("sitemap") {
            return None;
        }
        let url = normalize_space(value);
        (!url.is_empty()).then_some(url)
    });
    dedupe_keep_order(urls)
}

/// Decompresses a sitemap body when it carries the gzip magic prefix
///
/// `.gz` sitemaps served with `Content-Encoding: gzip` arrive already
/// decoded, so the URL suffix alone does not force decompression.
pub fn decode_sitemap_bytes(raw: &[u8]) -> Result<Vec<u8>, SitemapError> {
    if !raw.starts_with(&GZIP_MAGIC) {
        return Ok(raw.to_vec());
    }

    let mut decoder = GzDecoder::new(raw);
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded)?;
    Ok(decoded)
}

/// Every `<loc>` value in a sitemap document, namespace-agnostic
///
/// Values are whitespace-normalized and de-duplicated in document order.
pub fn parse_sitemap_locs(raw: &[u8]) -> Result<Vec<String>, SitemapError> {
    let payload = decode_sitemap_bytes(raw)?;

    let mut reader = Reader::from_reader(payload.as_slice());
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut saw_root = false;
    let mut depth = 0usize;
    let mut in_loc = false;
    let mut current = String::new();
    let mut locs = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                saw_root = true;
                depth += 1;
                if e.local_name().as_ref() == b"loc" {
                    in_loc = true;
                    current.clear();
                }
            }
            Event::Empty(_) => saw_root = true,
            Event::Text(t) if in_loc => current.push_str(&t.unescape()?),
            Event::CData(c) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if in_loc && e.local_name().as_ref() == b"loc" {
                    in_loc = false;
                    let loc = normalize_space(&current);
                    if !loc.is_empty() {
                        locs.push(loc);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(SitemapError::Empty);
    }
    if depth > 0 {
        return Err(SitemapError::Truncated(depth));
    }

    Ok(dedupe_keep_order(locs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const URLSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://twinset.ru/catalog/platya/251tp2150/123/</loc><lastmod>2024-01-01</lastmod></url>
  <url><loc>
      https://twinset.ru/catalog/yubki/
  </loc></url>
  <url><loc>https://twinset.ru/catalog/platya/251tp2150/123/</loc></url>
</urlset>"#;

    #[test]
    fn test_robots_sitemap_lines() {
        let robots = "User-agent: *\nDisallow: /bitrix/\nSitemap: https://twinset.ru/sitemap.xml\n\
                      sitemap:https://twinset.ru/sitemap-iblock-3.xml\nSITEMAP: https://twinset.ru/sitemap.xml\n";
        assert_eq!(
            sitemaps_from_robots(robots),
            vec![
                "https://twinset.ru/sitemap.xml",
                "https://twinset.ru/sitemap-iblock-3.xml",
            ]
        );
    }

    #[test]
    fn test_parse_urlset() {
        let locs = parse_sitemap_locs(URLSET.as_bytes()).unwrap();
        assert_eq!(
            locs,
            vec![
                "https://twinset.ru/catalog/platya/251tp2150/123/",
                "https://twinset.ru/catalog/yubki/",
            ]
        );
    }

    #[test]
    fn test_parse_prefixed_sitemap_index() {
        let xml = r#"<sm:sitemapindex xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
            <sm:sitemap><sm:loc>https://www.twinset.com/sitemap_0-product.xml</sm:loc></sm:sitemap>
            <sm:sitemap><sm:loc><![CDATA[https://www.twinset.com/sitemap_1-category.xml.gz]]></sm:loc></sm:sitemap>
        </sm:sitemapindex>"#;
        let locs = parse_sitemap_locs(xml.as_bytes()).unwrap();
        assert_eq!(locs.len(), 2);
        assert!(locs.iter().all(|loc| is_nested_sitemap(loc)));
    }

    #[test]
    fn test_parse_gzip_payload() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(URLSET.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let locs = parse_sitemap_locs(&compressed).unwrap();
        assert_eq!(locs.len(), 2);
    }

    #[test]
    fn test_corrupt_gzip_is_error() {
        let raw = [0x1f, 0x8b, 0x00, 0x01, 0x02];
        assert!(matches!(
            parse_sitemap_locs(&raw),
            Err(SitemapError::Gzip(_))
        ));
    }

    #[test]
    fn test_malformed_xml_is_error() {
        assert!(parse_sitemap_locs(b"<urlset><url><loc>x</url></urlset>").is_err());
        assert!(matches!(parse_sitemap_locs(b""), Err(SitemapError::Empty)));
    }

    #[test]
    fn test_truncated_document_is_error() {
        let raw = b"<urlset><url><loc>https://twinset.ru/catalog/a/1/</loc></url>\
                    <url><loc>https://twin";
        assert!(matches!(
            parse_sitemap_locs(raw),
            Err(SitemapError::Truncated(_))
        ));
    }

    #[test]
    fn test_escaped_loc() {
        let xml = "<urlset><url><loc>https://twinset.ru/catalog/?a=1&amp;b=2</loc></url></urlset>";
        assert_eq!(
            parse_sitemap_locs(xml.as_bytes()).unwrap(),
            vec!["https://twinset.ru/catalog/?a=1&b=2"]
        );
    }

    #[test]
    fn test_candidate_kinds() {
        assert!(is_robots_url("https://twinset.ru/robots.txt"));
        assert!(!is_robots_url("https://twinset.ru/sitemap.xml"));
        assert!(is_nested_sitemap("https://twinset.ru/sitemap-files.XML"));
        assert!(!is_nested_sitemap("https://twinset.ru/catalog/"));
    }
}
