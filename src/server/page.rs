use std::borrow::Cow;

use crate::catalog::PopularBook;
use crate::recommend::{RecommendationResult, Recommender};

const NO_MATCH: &str = "No matches found — try a different title or choose from Top 50 below.";
const BLANK_QUERY: &str = "Please type a book title or click a Top 50 book.";
const NOTHING_SELECTED: &str =
    "Search a book or click 'Show Similar' on any Top 50 book below to see similar reads here.";

const STYLE: &str = r#"
body { margin: 0; font-family: Arial, sans-serif; background: #fafafa; color: #222; }
main { padding: 0 24px 24px; }
.topbar { background: #0fa66b; padding: 8px 20px; color: white; display: flex; align-items: center; justify-content: space-between; }
.brand { font-size: 18px; font-weight: 700; }
.search-form { display: flex; gap: 6px; align-items: flex-end; flex-wrap: wrap; }
.search-form label { width: 100%; font-size: 14px; }
.search-form input[type=text] { flex: 6; min-width: 240px; padding: 6px; border-radius: 4px; border: 1px solid #ccc; }
.search-form button, .search-form .button { flex: 1; padding: 6px 12px; border-radius: 4px; border: 1px solid #0fa66b; background: white; color: #0fa66b; text-align: center; text-decoration: none; cursor: pointer; font-size: 14px; }
.notice { padding: 10px 14px; border-radius: 6px; margin: 12px 0; }
.notice.info { background: #e8f1fb; color: #0b4a8b; }
.notice.warning { background: #fff6dc; color: #7a5a00; }
.grid { display: grid; grid-template-columns: repeat(5, minmax(0, 1fr)); gap: 15px; }
.book-card { border: 1px solid #eee; border-radius: 10px; padding: 10px; text-align: center; background: #fff; height: 320px; display: flex; flex-direction: column; justify-content: space-between; }
.book-card img { width: 120px; height: 160px; object-fit: cover; border-radius: 5px; margin: 0 auto; display: block; }
.book-card .no-image { width: 120px; height: 160px; margin: 0 auto; line-height: 160px; color: #999; font-size: 12px; background: #f3f3f3; border-radius: 5px; }
.book-title { font-weight: bold; margin: 8px 0 4px 0; font-size: 14px; height: 36px; overflow: hidden; }
.book-author { color: gray; font-size: 12px; margin: 0; }
.rating { margin: 4px 0; font-size: 13px; }
.recommendation { height: auto; }
"#;

/// Escapes text for interpolation into HTML element content or attributes.
pub fn escape_html(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(raw);
    }
    let mut escaped = String::with_capacity(raw.len() + 16);
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// What the `book` query parameter asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection<'a> {
    Nothing,
    Blank,
    Title(&'a str),
}

impl<'a> Selection<'a> {
    fn from_param(book: Option<&'a str>) -> Self {
        match book.map(str::trim) {
            None => Selection::Nothing,
            Some("") => Selection::Blank,
            Some(title) => Selection::Title(title),
        }
    }
}

/// Renders the full recommendation page.
///
/// `book` is the raw `book` query parameter; `count` is how many similar books
/// to show for it.
pub fn render_page(recommender: &Recommender, book: Option<&str>, count: usize) -> String {
    let selection = Selection::from_param(book);
    let prefill = match selection {
        Selection::Title(title) => title,
        _ => "",
    };

    let mut html = String::with_capacity(32 * 1024);
    html.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\" />\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
    html.push_str("<title>Book Recommender</title>\n<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n");
    html.push_str("<div class=\"topbar\"><div class=\"brand\">📚 My Book Recommender</div></div>\n");
    html.push_str("<main>\n<section class=\"search\">\n<h2>Find recommendations</h2>\n");
    html.push_str(&format!(
        "<form class=\"search-form\" method=\"get\" action=\"/\">\n\
         <label for=\"book\">Enter a book title or pick one below:</label>\n\
         <input type=\"text\" id=\"book\" name=\"book\" value=\"{}\" />\n\
         <button type=\"submit\">Recommend</button>\n\
         <a class=\"button\" href=\"/\">Clear</a>\n\
         </form>\n",
        escape_html(prefill)
    ));

    match selection {
        Selection::Title(title) => {
            let found = recommender.lookup(title, count);
            html.push_str(&format!(
                "<h3>Recommendations for: <strong>{}</strong></h3>\n",
                escape_html(title)
            ));
            if found.results.is_empty() {
                html.push_str(&notice("info", NO_MATCH));
            } else {
                html.push_str("<div class=\"grid\">\n");
                for result in &found.results {
                    html.push_str(&recommendation_card(result));
                }
                html.push_str("</div>\n");
            }
        }
        Selection::Blank => {
            html.push_str(&notice("warning", BLANK_QUERY));
            html.push_str(&notice("info", NOTHING_SELECTED));
        }
        Selection::Nothing => html.push_str(&notice("info", NOTHING_SELECTED)),
    }
    html.push_str("</section>\n<hr />\n");

    html.push_str("<section class=\"popular\">\n<h2>📈 Top 50 Books</h2>\n<div class=\"grid\">\n");
    for book in recommender.popular() {
        html.push_str(&popular_card(book));
    }
    html.push_str("</div>\n</section>\n</main>\n</body>\n</html>\n");
    html
}

fn notice(kind: &str, message: &str) -> String {
    format!(
        "<div class=\"notice {kind}\">{}</div>\n",
        escape_html(message)
    )
}

fn cover(image: Option<&str>) -> String {
    match image {
        Some(url) => format!("<img src=\"{}\" alt=\"\" />", escape_html(url)),
        None => "<div class=\"no-image\">(no image)</div>".to_string(),
    }
}

fn recommendation_card(result: &RecommendationResult) -> String {
    format!(
        "<div class=\"book-card recommendation\">\n<div>{}\n\
         <div class=\"book-title\">{}</div>\n\
         <div class=\"book-author\">by {}</div>\n</div>\n</div>\n",
        cover(result.image.as_deref()),
        escape_html(&result.title),
        escape_html(&result.author)
    )
}

fn popular_card(book: &PopularBook) -> String {
    format!(
        "<div class=\"book-card\">\n<div>{}\n\
         <div class=\"book-title\">{}</div>\n\
         <div class=\"book-author\">by {}</div>\n\
         <div class=\"rating\">⭐ {} | {} votes</div>\n</div>\n\
         <form method=\"get\" action=\"/\">\
         <input type=\"hidden\" name=\"book\" value=\"{}\" />\
         <button type=\"submit\">Show Similar</button></form>\n</div>\n",
        cover(book.image.as_deref()),
        escape_html(&book.title),
        escape_html(&book.author),
        format_rating(book.average_rating),
        book.rating_count,
        escape_html(&book.title)
    )
}

/// Rating rounded to two decimals, without trailing zeros ("4.5", "4.0").
fn format_rating(rating: f64) -> String {
    format!("{:?}", (rating * 100.0).round() / 100.0)
}
