//! Reuters section scraper.
//!
//! Each section has one archive listing page, e.g.
//! `https://www.reuters.com/news/archive/africa/?date=today`, with stories
//! wrapped in `div.story-content` blocks. The first link of each block is
//! resolved against the listing URL to give an absolute article URL.
//!
//! Article pages are reduced to a title and a plain-text body. Extraction
//! tries structured data first and falls back to progressively looser
//! paragraph selectors, so it keeps working on other outlets' markup too.

use crate::models::{NewsArticle, Section};
use crate::utils::{normalize_whitespace, truncate_for_log};
use futures::stream::{self, StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

static ANCHOR: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector("meta[property='og:title']"));
static HEADLINE: Lazy<Selector> = Lazy::new(|| selector("h1"));
static DOC_TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static JSON_LD: Lazy<Selector> = Lazy::new(|| selector("script[type='application/ld+json']"));

/// Body selectors, most specific first.
static BODY_CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["[data-testid^='paragraph-']", "article p", "p"]
        .into_iter()
        .map(selector)
        .collect()
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("static selector {css:?} is invalid: {e:?}"))
}

/// Download one section listing page and return its article URLs.
///
/// At most `section.max_articles` URLs are returned.
#[instrument(level = "info", skip_all, fields(section = %section.name, url = %section.listing_url))]
pub async fn index_section(
    client: &Client,
    section: &Section,
    story_selector: &str,
) -> Result<Vec<String>, Box<dyn Error>> {
    let html = get_text(client, &section.listing_url).await?;
    let urls = parse_listing(&html, &section.listing_url, story_selector, section.max_articles)?;

    info!(count = urls.len(), limit = section.max_articles, "Indexed section article URLs");
    debug!(urls = ?urls, "Section URLs");
    Ok(urls)
}

/// Extract up to `limit` article URLs from a listing page.
///
/// Only the first link inside each story block is considered; blocks
/// without a link are skipped.
///
/// # Arguments
///
/// * `html` - Raw listing page
/// * `listing_url` - URL the page was fetched from; relative hrefs are resolved against it
/// * `story_selector` - CSS selector matching one story block
/// * `limit` - Maximum number of URLs to return
///
/// # Returns
///
/// Absolute article URLs in page order, or an error if `listing_url` is not
/// a valid URL or `story_selector` does not parse.
pub fn parse_listing(
    html: &str,
    listing_url: &str,
    story_selector: &str,
    limit: usize,
) -> Result<Vec<String>, Box<dyn Error>> {
    let base = Url::parse(listing_url)?;
    let stories = Selector::parse(story_selector)
        .map_err(|e| format!("invalid story selector {story_selector:?}: {e:?}"))?;
    let document = Html::parse_document(html);

    let urls = document
        .select(&stories)
        .filter_map(|story| story.select(&ANCHOR).next())
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| match base.join(href.trim()) {
            Ok(resolved) => Some(resolved.to_string()),
            Err(e) => {
                warn!(%href, error = %e, "Skipping unresolvable story link");
                None
            }
        })
        .take(limit)
        .collect();
    Ok(urls)
}

/// Download and parse a single article.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn fetch_article(client: &Client, url: &str) -> Result<NewsArticle, Box<dyn Error>> {
    let html = get_text(client, url).await?;
    let article = parse_article(&html);

    if article.text.is_empty() {
        warn!("Article page produced no body text");
    }
    info!(
        title = %truncate_for_log(&article.title, 80),
        bytes = article.text.len(),
        "Parsed article"
    );
    Ok(article)
}

/// Reduce an article page to its title and body text.
pub fn parse_article(html: &str) -> NewsArticle {
    let document = Html::parse_document(html);
    NewsArticle {
        title: extract_title(&document),
        text: extract_body(&document),
    }
}

fn extract_title(document: &Html) -> String {
    let og_title = document
        .select(&OG_TITLE)
        .filter_map(|meta| meta.value().attr("content"))
        .map(normalize_whitespace)
        .find(|title| !title.is_empty());

    og_title
        .or_else(|| first_text(document, &HEADLINE))
        .or_else(|| first_text(document, &DOC_TITLE))
        .unwrap_or_default()
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn extract_body(document: &Html) -> String {
    if let Some(body) = json_ld_body(document) {
        return body;
    }

    for candidate in BODY_CANDIDATES.iter() {
        let paragraphs: Vec<String> = document
            .select(candidate)
            .map(element_text)
            .filter(|p| !p.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            return paragraphs.join("\n\n");
        }
    }
    String::new()
}

/// `articleBody` from any JSON-LD block, including `@graph` and array forms.
fn json_ld_body(document: &Html) -> Option<String> {
    document
        .select(&JSON_LD)
        .filter_map(|script| {
            serde_json::from_str::<serde_json::Value>(script.text().collect::<String>().trim()).ok()
        })
        .find_map(|json| find_article_body(&json))
}

fn find_article_body(json: &serde_json::Value) -> Option<String> {
    match json {
        serde_json::Value::Array(items) => items.iter().find_map(find_article_body),
        serde_json::Value::Object(obj) => obj
            .get("articleBody")
            .and_then(|body| body.as_str())
            .map(|body| {
                body.split('\n')
                    .map(normalize_whitespace)
                    .filter(|p| !p.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n")
            })
            .filter(|body| !body.is_empty())
            .or_else(|| obj.get("@graph").and_then(find_article_body)),
        _ => None,
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

async fn get_text(client: &Client, url: &str) -> Result<String, Box<dyn Error>> {
    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(body)
}

/// Index every section, then download each discovered article.
///
/// Strictly sequential: one request in flight at a time. The first failure
/// aborts the run.
#[instrument(level = "info", skip_all, fields(sections = sections.len()))]
pub async fn scrape_sections(
    client: &Client,
    sections: Vec<Section>,
    story_selector: &str,
) -> Result<Vec<Section>, Box<dyn Error>> {
    let mut scraped = Vec::with_capacity(sections.len());

    for mut section in sections {
        section.article_urls = index_section(client, &section, story_selector).await?;
        section.articles = stream::iter(section.article_urls.iter())
            .then(|url| fetch_article(client, url))
            .try_collect()
            .await?;

        info!(
            section = %section.name,
            fetched = section.articles.len(),
            "Fetched section article contents"
        );
        scraped.push(section);
    }

    Ok(scraped)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <section class="module-content">
            <article class="story">
              <div class="story-content">
                <a href="/article/us-africa-mali-idUSKBN1">
                  <h3 class="story-title">Mali junta extends transition</h3>
                </a>
                <a href="/article/related-1">Related</a>
              </div>
            </article>
            <article class="story">
              <div class="story-content"><p>No link in this one</p></div>
            </article>
            <article class="story">
              <div class="story-content">
                <a href="https://www.reuters.com/article/us-kenya-idUSKBN2">Kenya</a>
              </div>
            </article>
            <article class="story">
              <div class="story-content"><a href="/article/third">Third</a></div>
            </article>
          </section>
        </body></html>
    "#;

    const LISTING_URL: &str = "https://www.reuters.com/news/archive/africa/?date=today";

    #[test]
    fn test_parse_listing_takes_first_link_per_story() {
        let urls = parse_listing(LISTING, LISTING_URL, "div.story-content", 10).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://www.reuters.com/article/us-africa-mali-idUSKBN1",
                "https://www.reuters.com/article/us-kenya-idUSKBN2",
                "https://www.reuters.com/article/third",
            ]
        );
    }

    #[test]
    fn test_parse_listing_honors_limit() {
        let urls = parse_listing(LISTING, LISTING_URL, "div.story-content", 2).unwrap();
        assert_eq!(urls.len(), 2);
        assert!(parse_listing(LISTING, LISTING_URL, "div.story-content", 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_parse_listing_rejects_bad_selector() {
        assert!(parse_listing(LISTING, LISTING_URL, "div[", 3).is_err());
    }

    #[test]
    fn test_parse_article_prefers_og_title_and_json_ld_body() {
        let html = r#"
            <html><head>
              <title>Ignored | Reuters</title>
              <meta property="og:title" content="  Markets rally   on rate hopes ">
              <script type="application/ld+json">
                {"@context": "https://schema.org", "@graph": [
                  {"@type": "WebPage"},
                  {"@type": "NewsArticle", "articleBody": "Stocks rose on Monday.\nBonds   fell."}
                ]}
              </script>
            </head><body>
              <h1>Also ignored</h1>
              <p>Fallback paragraph</p>
            </body></html>
        "#;
        let article = parse_article(html);
        assert_eq!(article.title, "Markets rally on rate hopes");
        assert_eq!(article.text, "Stocks rose on Monday.\n\nBonds fell.");
    }

    #[test]
    fn test_parse_article_uses_reuters_paragraph_blocks() {
        let html = r#"
            <html><body>
              <h1 data-testid="Heading">Ceasefire talks resume</h1>
              <article>
                <div data-testid="paragraph-0">CAIRO, Jan 2 (Reuters) - Talks resumed.</div>
                <div data-testid="paragraph-1">Mediators were  hopeful.</div>
                <p class="caption">Photo caption</p>
              </article>
            </body></html>
        "#;
        let article = parse_article(html);
        assert_eq!(article.title, "Ceasefire talks resume");
        assert_eq!(
            article.text,
            "CAIRO, Jan 2 (Reuters) - Talks resumed.\n\nMediators were hopeful."
        );
    }

    #[test]
    fn test_parse_article_falls_back_to_article_paragraphs() {
        let html = r#"
            <html><head><title>Doc title</title></head><body>
              <nav><p>Menu</p></nav>
              <article><p>First.</p><p></p><p>Second.</p></article>
            </body></html>
        "#;
        let article = parse_article(html);
        assert_eq!(article.title, "Doc title");
        assert_eq!(article.text, "First.\n\nSecond.");
    }

    #[test]
    fn test_parse_article_empty_page() {
        let article = parse_article("<html><body></body></html>");
        assert_eq!(article.title, "");
        assert_eq!(article.text, "");
    }

    mod http {
        use super::*;
        use std::sync::{Arc, Mutex};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        const ROUTES: &[(&str, &str)] = &[
            (
                "/world",
                r#"<div class="story-content"><a href="/a1">One</a></div>
                   <div class="story-content"><a href="/missing">Gone</a></div>"#,
            ),
            (
                "/africa",
                r#"<div class="story-content"><a href="/a2">Two</a></div>"#,
            ),
            (
                "/a1",
                "<html><head><title>T1</title></head><body><article><p>Body one.</p></article></body></html>",
            ),
            (
                "/a2",
                "<html><head><title>T2</title></head><body><article><p>Body two.</p></article></body></html>",
            ),
        ];

        /// Local HTTP server answering `ROUTES` and 404 for anything else.
        /// Returns the base URL and the request paths in arrival order.
        async fn serve() -> (String, Arc<Mutex<Vec<String>>>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let log = Arc::new(Mutex::new(Vec::new()));

            let requests = Arc::clone(&log);
            tokio::spawn(async move {
                loop {
                    let (mut socket, _) = listener.accept().await.unwrap();
                    let requests = Arc::clone(&requests);
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                            let n = socket.read(&mut buf).await.unwrap();
                            if n == 0 {
                                return;
                            }
                            head.extend_from_slice(&buf[..n]);
                        }
                        let head = String::from_utf8_lossy(&head);
                        let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                        requests.lock().unwrap().push(path.clone());

                        let (status, body) = match ROUTES.iter().find(|(route, _)| *route == path) {
                            Some((_, body)) => ("200 OK", *body),
                            None => ("404 Not Found", "not found"),
                        };
                        let response = format!(
                            "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                            body.len()
                        );
                        socket.write_all(response.as_bytes()).await.unwrap();
                        socket.shutdown().await.ok();
                    });
                }
            });
            (base, log)
        }

        fn client() -> Client {
            Client::builder().no_proxy().build().unwrap()
        }

        #[tokio::test]
        async fn test_scrape_sections_aligns_articles_with_urls() {
            let (base, _) = serve().await;
            let sections = vec![Section::new("world", format!("{base}/world"), 1)];

            let scraped = scrape_sections(&client(), sections, "div.story-content")
                .await
                .unwrap();

            assert_eq!(scraped.len(), 1);
            assert_eq!(scraped[0].article_urls, vec![format!("{base}/a1")]);
            assert_eq!(
                scraped[0].articles,
                vec![NewsArticle {
                    title: "T1".to_string(),
                    text: "Body one.".to_string(),
                }]
            );
        }

        #[tokio::test]
        async fn test_scrape_sections_aborts_on_http_error() {
            let (base, _) = serve().await;
            let sections = vec![Section::new("world", format!("{base}/world"), 2)];

            let err = scrape_sections(&client(), sections, "div.story-content")
                .await
                .unwrap_err();
            assert!(err.to_string().contains("404"), "unexpected error: {err}");
        }

        #[tokio::test]
        async fn test_index_section_fails_on_missing_listing() {
            let (base, _) = serve().await;
            let section = Section::new("asia", format!("{base}/asia"), 3);
            assert!(index_section(&client(), &section, "div.story-content").await.is_err());
        }

        #[tokio::test]
        async fn test_scrape_sections_fetches_in_order() {
            let (base, log) = serve().await;
            let sections = vec![
                Section::new("world", format!("{base}/world"), 1),
                Section::new("africa", format!("{base}/africa"), 3),
            ];

            let scraped = scrape_sections(&client(), sections, "div.story-content")
                .await
                .unwrap();

            assert_eq!(scraped[1].articles[0].title, "T2");
            assert_eq!(*log.lock().unwrap(), vec!["/world", "/a1", "/africa", "/a2"]);
        }
    }
}
