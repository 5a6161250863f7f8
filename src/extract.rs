//! Direct link recovery from a MediaFire share page.
//!
//! MediaFire exposes the real file URL in a few different places depending on
//! page revision. Each place gets its own [`Strategy`]; they are tried in the
//! order of [`STRATEGIES`] and the first one that yields a non-empty value
//! wins. New fallbacks go at the end of the table.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{RelayError, Result};

/// One way of finding the direct link in a page.
pub struct Strategy {
    pub name: &'static str,
    pub find: fn(&str) -> Option<String>,
}

pub const STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "download_button",
        find: find_download_button,
    },
    Strategy {
        name: "download_url_assignment",
        find: find_download_url_assignment,
    },
    Strategy {
        name: "dl_link_assignment",
        find: find_dl_link_assignment,
    },
    Strategy {
        name: "script_file_url",
        find: find_script_file_url,
    },
];

/// Extensions recognised by the last-resort script scan, compound ones first.
const FILE_EXTENSIONS: &[&str] = &[
    "tar.gz", "zip", "rar", "7z", "exe", "mp4", "mp3", "pdf", "docx", "doc", "xlsx", "xls",
    "pptx", "ppt", "jpeg", "jpg", "png", "gif", "txt", "iso", "apk", "dmg", "deb", "rpm", "gz",
    "bz2", "xz",
];

static DOWNLOAD_BUTTON: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a#download-button").expect("download button selector is valid")
});

static SCRIPT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("script selector is valid"));

static DOWNLOAD_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bdownload_url\s*=\s*["']([^"']+)["']"#)
        .expect("download_url pattern is valid")
});

// `window.dl_link = "..."` and friends
static DL_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:[\w$]+\.)*\bdl_link\s*=\s*["']([^"']+)["']"#)
        .expect("dl_link pattern is valid")
});

static FILE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    let extensions = FILE_EXTENSIONS
        .iter()
        .map(|ext| regex::escape(ext))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r#"(?i)(https?://[^\s"'<>\\]+?\.(?:{extensions}))(?:["'\s<>\\;,)]|$)"#
    ))
    .expect("file url pattern is valid")
});

/// A direct link and the strategy that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectLink {
    pub url: String,
    pub strategy: &'static str,
}

/// Run every strategy in priority order and return the first hit.
pub fn extract_direct_link(page: &str) -> Result<DirectLink> {
    STRATEGIES
        .iter()
        .find_map(|strategy| {
            (strategy.find)(page)
                .filter(|url| !url.is_empty())
                .map(|url| DirectLink {
                    url,
                    strategy: strategy.name,
                })
        })
        .ok_or(RelayError::ExtractionFailed)
}

/// `<a id="download-button" href="...">`
fn find_download_button(page: &str) -> Option<String> {
    let document = Html::parse_document(page);
    document
        .select(&DOWNLOAD_BUTTON)
        .filter_map(|element| element.value().attr("href"))
        .find(|href| !href.is_empty())
        .map(str::to_string)
}

/// `download_url = "..."` inside a `<script>` block.
fn find_download_url_assignment(page: &str) -> Option<String> {
    capture_in_scripts(&DOWNLOAD_URL_RE, page)
}

/// `dl_link = "..."` inside a `<script>` block, with or without an object
/// path in front (`window.dl_link`, `MF.page.dl_link`).
fn find_dl_link_assignment(page: &str) -> Option<String> {
    capture_in_scripts(&DL_LINK_RE, page)
}

/// Any absolute URL ending in a known file extension inside a `<script>` block.
fn find_script_file_url(page: &str) -> Option<String> {
    capture_in_scripts(&FILE_URL_RE, page)
}

/// First capture of `re` across the page's scripts, in document order.
fn capture_in_scripts(re: &Regex, page: &str) -> Option<String> {
    let document = Html::parse_document(page);
    document.select(&SCRIPT).find_map(|script| {
        let source = script.text().collect::<String>();
        capture_first(re, &source)
    })
}

fn capture_first(re: &Regex, haystack: &str) -> Option<String> {
    re.captures_iter(haystack)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_button_wins_over_everything_else() {
        let page = r#"
            <html><head><script>
                var download_url = "https://b.example/second.zip";
                window.dl_link = "https://c.example/third.zip";
                var other = "https://d.example/fourth.zip";
            </script></head>
            <body><a class="input" id="download-button" href="https://download123.mediafire.com/xyz/first.zip">Download</a></body>
            </html>"#;
        let link = extract_direct_link(page).unwrap();
        assert_eq!(link.url, "https://download123.mediafire.com/xyz/first.zip");
        assert_eq!(link.strategy, "download_button");
    }

    #[test]
    fn download_button_tag_and_attribute_names_are_case_insensitive() {
        let page = r#"<A ID="download-button" HREF="https://download1.mediafire.com/a/b.rar">x</A>"#;
        assert_eq!(
            extract_direct_link(page).unwrap().url,
            "https://download1.mediafire.com/a/b.rar"
        );
    }

    #[test]
    fn download_button_without_href_falls_through() {
        let page = r#"
            <a id="download-button">Download</a>
            <script>var download_url = "https://x.example/f.bin";</script>"#;
        let link = extract_direct_link(page).unwrap();
        assert_eq!(link.url, "https://x.example/f.bin");
        assert_eq!(link.strategy, "download_url_assignment");
    }

    #[test]
    fn download_url_assignment_is_second() {
        let page = r#"<script>
            window.dl_link = "https://c.example/third.zip";
            var download_url = "https://b.example/second";
        </script>"#;
        let link = extract_direct_link(page).unwrap();
        assert_eq!(link.url, "https://b.example/second");
        assert_eq!(link.strategy, "download_url_assignment");
    }

    #[test]
    fn download_url_keyword_is_case_insensitive() {
        let page = r#"<script>var Download_URL='https://b.example/x';</script>"#;
        assert_eq!(extract_direct_link(page).unwrap().url, "https://b.example/x");
    }

    #[test]
    fn dl_link_assignment_is_third() {
        let page = r#"<script>
            var other = "https://d.example/fourth.zip";
            window.dl_link = "https://c.example/third";
        </script>"#;
        let link = extract_direct_link(page).unwrap();
        assert_eq!(link.url, "https://c.example/third");
        assert_eq!(link.strategy, "dl_link_assignment");
    }

    #[test]
    fn empty_assignments_are_skipped() {
        let page = r#"<script>
            var download_url = "";
            mf.dl_link = "https://c.example/third";
        </script>"#;
        assert_eq!(extract_direct_link(page).unwrap().url, "https://c.example/third");
    }

    #[test]
    fn assignments_outside_scripts_are_ignored() {
        let page = r#"
            <p>Tip: set download_url = "https://text.example/a.bin" in your config</p>
            <pre>window.dl_link = 'https://text.example/b.bin'</pre>
            <script>var n = 1;</script>"#;
        assert!(matches!(
            extract_direct_link(page),
            Err(RelayError::ExtractionFailed)
        ));
    }

    #[test]
    fn bare_dl_link_assignment_matches() {
        let page = r#"<script>dl_link = "https://c.example/bare";</script>"#;
        let link = extract_direct_link(page).unwrap();
        assert_eq!(link.url, "https://c.example/bare");
        assert_eq!(link.strategy, "dl_link_assignment");
    }

    #[test]
    fn script_file_url_is_last_resort() {
        let page = r#"
            <p>https://not-in-script.example/file.zip</p>
            <script>
                var cfg = {"mirror": "https://download2.mediafire.com/q/archive.tar.gz", "n": 1};
            </script>"#;
        let link = extract_direct_link(page).unwrap();
        assert_eq!(link.url, "https://download2.mediafire.com/q/archive.tar.gz");
        assert_eq!(link.strategy, "script_file_url");
    }

    #[test]
    fn script_scan_ignores_urls_outside_scripts_and_other_extensions() {
        let page = r#"
            <a href="https://elsewhere.example/file.zip">zip</a>
            <script>var page = "https://www.mediafire.com/about.html";</script>"#;
        assert!(matches!(
            extract_direct_link(page),
            Err(RelayError::ExtractionFailed)
        ));
    }

    #[test]
    fn script_scan_matches_extensions_case_insensitively() {
        let page = r#"<script>go('https://download9.mediafire.com/z/Setup.EXE')</script>"#;
        assert_eq!(
            extract_direct_link(page).unwrap().url,
            "https://download9.mediafire.com/z/Setup.EXE"
        );
    }

    #[test]
    fn nothing_matching_is_extraction_failure() {
        let page = "<html><body><p>File removed</p></body></html>";
        assert!(matches!(
            extract_direct_link(page),
            Err(RelayError::ExtractionFailed)
        ));
    }

    #[test]
    fn strategy_order_is_stable() {
        let names: Vec<_> = STRATEGIES.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            [
                "download_button",
                "download_url_assignment",
                "dl_link_assignment",
                "script_file_url"
            ]
        );
    }
}
