use crate::model::Attachment;
use crate::report::{AltReport, Bucket};

const STATUS_GOOD: &str = "Has a valid alt text attribute";
const STATUS_BAD: &str = "Missing alt text attribute";

/// Renders the full self-contained report page with the toggle client
/// embedded.
pub fn render_report_page(report: &AltReport, endpoint: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Missing Alt Text</title>
    <style>{css}</style>
</head>
<body>
{fragment}
    <script>{js}</script>
</body>
</html>"#,
        css = inline_css(),
        fragment = render_report_fragment(report, endpoint),
        js = inline_javascript(),
    )
}

/// The admin fragment alone: headline coverage plus one table row per
/// classified attachment. Bad rows come first since they are the ones
/// needing remediation.
pub fn render_report_fragment(report: &AltReport, endpoint: &str) -> String {
    let stats = &report.stats;

    let mut rows = String::new();
    for attachment in &report.classified.bad {
        rows.push_str(&render_row(attachment, Bucket::Bad));
        rows.push('\n');
    }
    for attachment in &report.classified.good {
        rows.push_str(&render_row(attachment, Bucket::Good));
        rows.push('\n');
    }
    for attachment in &report.classified.decorative {
        rows.push_str(&render_row(attachment, Bucket::Decorative));
        rows.push('\n');
    }

    format!(
        r#"<div class="report">
<h1>Missing Alt Text</h1>
<p>You've added alt text to {good} ({good_pct}%) images.</p>
<p>You're missing alt text on {bad} ({bad_pct}%) images.</p>
<p>You've marked {decorative} ({decorative_pct}%) images as decorative.</p>
<table data-endpoint="{endpoint}">
<thead>
<tr><th>ID</th><th>Decorative</th><th>Actions</th><th>Status</th><th>Alt text</th></tr>
</thead>
<tbody>
{rows}</tbody>
</table>
</div>"#,
        good = stats.good_count,
        good_pct = stats.good_pct,
        bad = stats.bad_count,
        bad_pct = stats.bad_pct,
        decorative = stats.decorative_count,
        decorative_pct = stats.decorative_pct,
        endpoint = html_escape(endpoint),
        rows = rows,
    )
}

/// One table row. Decorative rows carry only identity and the toggle
/// control; they need no remediation, so the edit/status/alt cells stay
/// empty.
fn render_row(attachment: &Attachment, bucket: Bucket) -> String {
    let row_class = match bucket {
        Bucket::Good => "row--provided",
        Bucket::Bad => "row--missing",
        Bucket::Decorative => "row--decorative",
    };

    let toggle = format!(
        r#"<button class="button--decorative-handler" data-id="{id}">Toggle decorative</button>"#,
        id = attachment.id,
    );

    let (edit, status, alt_text) = match bucket {
        Bucket::Decorative => (String::new(), "", String::new()),
        Bucket::Good => (render_edit_link(attachment.id), STATUS_GOOD, html_escape(&attachment.alt_text)),
        Bucket::Bad => (render_edit_link(attachment.id), STATUS_BAD, html_escape(&attachment.alt_text)),
    };

    format!(
        r#"<tr class="{row_class}"><td>{id}</td><td>{toggle}</td><td>{edit}</td><td>{status}</td><td>{alt_text}</td></tr>"#,
        row_class = row_class,
        id = attachment.id,
        toggle = toggle,
        edit = edit,
        status = status,
        alt_text = alt_text,
    )
}

fn render_edit_link(id: i64) -> String {
    format!(r#"<a href="post.php?post={id}&amp;action=edit" target="_blank">Edit</a>"#)
}

fn inline_css() -> &'static str {
    r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 0 50px; color: #1d2327; }
h1 { margin-top: 24px; }
table { border-collapse: collapse; width: 100%; margin-top: 16px; }
th, td { border: 1px solid #c3c4c7; padding: 6px 10px; text-align: left; }
th { background: #f6f7f7; }
tr.row--missing { background: #fcf0f1; }
tr.row--provided { background: #edfaef; }
tr.row--decorative { background: #f0f0f1; color: #646970; }
.button--decorative-handler { cursor: pointer; padding: 2px 8px; }
"#
}

/// The asynchronous toggle client. Transport and response-parse failures
/// are caught separately and go to the console; the row class flips only
/// after a parsed success response.
fn inline_javascript() -> &'static str {
    r#"
document.addEventListener("DOMContentLoaded", () => {
  const table = document.querySelector("table[data-endpoint]");
  if (!table) return;
  const endpoint = table.dataset.endpoint;

  table.querySelectorAll(".button--decorative-handler").forEach((button) => {
    button.addEventListener("click", async (event) => {
      event.preventDefault();

      const row = button.closest("tr");
      const id = button.getAttribute("data-id");
      if (!id) return;

      const value = !row.classList.contains("row--decorative");
      const body = new URLSearchParams({
        action: "convert_decorative",
        id: String(id),
        value: String(value),
      });

      try {
        const response = await fetch(endpoint, { method: "POST", body });
        try {
          const data = await response.json();
          if (data.message === "success") {
            row.classList.toggle("row--decorative");
          }
        } catch (error) {
          console.error(error);
        }
      } catch (error) {
        console.error(error);
      }
    });
  });
});
"#
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::build_report;

    fn attachment(id: i64, alt_text: &str, decorative: bool) -> Attachment {
        Attachment {
            id,
            alt_text: alt_text.to_string(),
            decorative,
        }
    }

    fn sample_report() -> AltReport {
        build_report(vec![
            attachment(1, "a castle", false),
            attachment(2, "", true),
            attachment(3, "", false),
        ])
    }

    #[test]
    fn fragment_reports_counts_and_percentages() {
        let fragment = render_report_fragment(&sample_report(), "admin-ajax.php");

        assert!(fragment.contains("added alt text to 1 (33.33%)"));
        assert!(fragment.contains("missing alt text on 1 (33.33%)"));
        assert!(fragment.contains("marked 1 (33.33%) images as decorative"));
        assert!(fragment.contains(r#"data-endpoint="admin-ajax.php""#));
    }

    #[test]
    fn decorative_rows_carry_only_identity_and_the_toggle() {
        let row = render_row(&attachment(2, "", true), Bucket::Decorative);

        assert!(row.starts_with(r#"<tr class="row--decorative">"#));
        assert!(row.contains(r#"data-id="2""#));
        assert!(row.ends_with("<td></td><td></td><td></td></tr>"));
        assert!(!row.contains("Edit"));
        assert!(!row.contains(STATUS_GOOD));
        assert!(!row.contains(STATUS_BAD));
    }

    #[test]
    fn good_and_bad_rows_carry_status_and_edit_link() {
        let good = render_row(&attachment(1, "a castle", false), Bucket::Good);
        assert!(good.starts_with(r#"<tr class="row--provided">"#));
        assert!(good.contains(STATUS_GOOD));
        assert!(good.contains("a castle"));
        assert!(good.contains(r#"post.php?post=1&amp;action=edit"#));

        let bad = render_row(&attachment(3, "", false), Bucket::Bad);
        assert!(bad.starts_with(r#"<tr class="row--missing">"#));
        assert!(bad.contains(STATUS_BAD));
    }

    #[test]
    fn alt_text_is_escaped() {
        let row = render_row(&attachment(5, r#"<img> & "quotes""#, false), Bucket::Good);

        assert!(row.contains("&lt;img&gt; &amp; &quot;quotes&quot;"));
        assert!(!row.contains("<img>"));
    }

    #[test]
    fn page_embeds_styles_and_toggle_client() {
        let page = render_report_page(&sample_report(), "admin-ajax.php");

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("row--decorative"));
        assert!(page.contains("convert_decorative"));
        assert!(page.contains("URLSearchParams"));
    }
}
