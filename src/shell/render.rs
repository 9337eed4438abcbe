//! Display policy shared by the web page and the CLI.

use crate::domain::model::{DiagnosisItem, DiagnosisOutcome};
use crate::utils::error::DdxError;

pub const PAGE_TITLE: &str = "X-ray Diagnostic Assistant";

/// `condition` or `condition — NN%` when a probability is present.
pub fn format_item(item: &DiagnosisItem) -> String {
    match item.probability {
        Some(probability) => format!("{} — {}%", item.condition, probability),
        None => item.condition.clone(),
    }
}

pub fn render_text(outcome: &DiagnosisOutcome) -> String {
    match outcome {
        DiagnosisOutcome::Rejected(verdict) => {
            format!("Image not suitable for analysis.\nReason: {}\n", verdict.reason)
        }
        DiagnosisOutcome::Diagnosed(result) => {
            let mut out = String::from("Differential Diagnosis\n\nExplanation:\n");
            out.push_str(&result.explanation);
            out.push_str("\n\nPossible Diagnoses:\n");
            if result.diagnoses.is_empty() {
                out.push_str("(none)\n");
            }
            for item in &result.diagnoses {
                out.push_str(&format!("- {}\n", format_item(item)));
            }
            out
        }
    }
}

/// 頁面目前的狀態
#[derive(Debug)]
pub enum PageView<'a> {
    Idle,
    MissingImage,
    Result {
        preview: Option<&'a str>,
        outcome: &'a DiagnosisOutcome,
    },
    Failed {
        preview: Option<&'a str>,
        error: &'a DdxError,
    },
}

pub fn render_page(view: &PageView<'_>) -> String {
    let mut body = String::new();
    body.push_str(&format!("<h1>🩻 {}</h1>\n", PAGE_TITLE));
    body.push_str(
        "<p>Upload a chest X-ray or other diagnostic image. The assistant will generate a list \
         of possible diagnoses based on the image.</p>\n",
    );

    match view {
        PageView::Idle => {}
        PageView::MissingImage => {
            body.push_str("<div class=\"notice\">Please choose an image to upload.</div>\n");
        }
        PageView::Result { preview, outcome } => {
            push_preview(&mut body, *preview);
            push_outcome(&mut body, outcome);
        }
        PageView::Failed { preview, error } => {
            push_preview(&mut body, *preview);
            body.push_str(&format!(
                "<div class=\"error\" role=\"alert\">{}</div>\n<pre class=\"detail\">{}</pre>\n",
                escape_html(&error.user_friendly_message()),
                escape_html(&error.to_string())
            ));
        }
    }

    // 無論結果如何都重新顯示表單，讓使用者可以再試一次
    body.push_str(UPLOAD_FORM);

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
         <style>{}</style>\n</head>\n<body>\n<main>\n{}</main>\n</body>\n</html>\n",
        PAGE_TITLE, STYLE, body
    )
}

fn push_preview(body: &mut String, preview: Option<&str>) {
    if let Some(src) = preview {
        body.push_str(&format!(
            "<figure><img src=\"{}\" alt=\"Uploaded Image\"><figcaption>Uploaded Image</figcaption></figure>\n",
            escape_html(src)
        ));
    }
}

fn push_outcome(body: &mut String, outcome: &DiagnosisOutcome) {
    match outcome {
        DiagnosisOutcome::Rejected(verdict) => {
            body.push_str("<section class=\"rejected\">\n<h2>Image not suitable for analysis</h2>\n");
            body.push_str(&format!("<p>{}</p>\n</section>\n", escape_html(&verdict.reason)));
        }
        DiagnosisOutcome::Diagnosed(result) => {
            body.push_str("<section class=\"diagnosis\">\n<h2>🩺 Differential Diagnosis</h2>\n");
            body.push_str("<p><strong>Explanation:</strong></p>\n");
            body.push_str(&format!("<p>{}</p>\n", escape_html(&result.explanation)));
            body.push_str("<p><strong>Possible Diagnoses:</strong></p>\n<ul>\n");
            for item in &result.diagnoses {
                body.push_str(&format!("<li>{}</li>\n", escape_html(&format_item(item))));
            }
            body.push_str("</ul>\n</section>\n");
        }
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const UPLOAD_FORM: &str = r#"<form method="post" action="/analyze" enctype="multipart/form-data">
<label for="image">Upload an image</label>
<input type="file" id="image" name="image" accept=".jpg,.jpeg,.png,image/jpeg,image/png" required>
<img id="preview" alt="Selected Image" hidden>
<button type="submit">Generate Differential Diagnosis</button>
</form>
<script>
document.getElementById("image").addEventListener("change", function (event) {
  var file = event.target.files[0];
  var preview = document.getElementById("preview");
  if (!file) { preview.hidden = true; return; }
  preview.src = URL.createObjectURL(file);
  preview.hidden = false;
});
</script>
"#;

const STYLE: &str = "main{max-width:720px;margin:2rem auto;font-family:sans-serif}\
img{max-width:100%}.error{background:#fdecea;color:#611a15;padding:.75rem;border-radius:4px}\
.notice{background:#fff4e5;padding:.75rem;border-radius:4px}.detail{white-space:pre-wrap}";
