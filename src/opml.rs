//! OPML feed lists: reading the `xmlUrl`s out of one, and writing one.

use roxmltree::{Document, Node};

use crate::app::{ConfluenceError, Result};
use crate::fetcher::{HttpClient, HttpOutcome};

pub const OPML_DOCS: &str = "http://dev.opml.org/spec2.html";

/// Feed URLs listed in an OPML document, in document order.
///
/// An outline with an `xmlUrl` is a feed; any other outline is a folder and
/// is searched recursively. Duplicates are dropped.
pub fn extract_feed_urls(content: &str) -> Result<Vec<String>> {
    let doc = Document::parse(content).map_err(|e| ConfluenceError::Opml(e.to_string()))?;

    let body = doc
        .root_element()
        .children()
        .find(|node| node.has_tag_name("body"))
        .ok_or_else(|| ConfluenceError::Opml("missing <body> element".into()))?;

    let mut urls = Vec::new();
    collect(body, &mut urls);
    Ok(urls)
}

fn collect(parent: Node, urls: &mut Vec<String>) {
    for outline in parent.children().filter(|n| n.has_tag_name("outline")) {
        match outline.attribute("xmlUrl").map(str::trim) {
            Some(url) if !url.is_empty() => {
                if !urls.iter().any(|u| u == url) {
                    urls.push(url.to_string());
                }
            }
            _ => collect(outline, urls),
        }
    }
}

/// Downloads the OPML document at `url` and extracts its feed URLs.
pub async fn fetch_feed_urls(client: &dyn HttpClient, url: &str) -> Result<Vec<String>> {
    match client.get(url, None, None).await? {
        HttpOutcome::Content { body, .. } => {
            let content = String::from_utf8_lossy(&body);
            extract_feed_urls(&content)
        }
        HttpOutcome::NotModified => Err(ConfluenceError::Opml(format!(
            "unexpected 304 for unconditional request to {}",
            url
        ))),
    }
}

/// OPML 2.0 document listing `urls` as RSS outlines.
pub fn feeds_opml(title: &str, urls: &[String]) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<opml version=\"2.0\">\n");
    out.push_str("  <head>\n");
    out.push_str(&format!(
        "    <title>{}</title>\n",
        html_escape::encode_text(title)
    ));
    out.push_str(&format!("    <docs>{}</docs>\n", OPML_DOCS));
    out.push_str("  </head>\n");
    out.push_str("  <body>\n");
    for url in urls {
        let url = html_escape::encode_double_quoted_attribute(url);
        out.push_str(&format!(
            "    <outline text=\"{}\" type=\"rss\" xmlUrl=\"{}\"/>\n",
            url, url
        ));
    }
    out.push_str("  </body>\n");
    out.push_str("</opml>\n");
    out
}
