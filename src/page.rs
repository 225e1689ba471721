//! HTML for the interactive page.

use crate::classifier::Prediction;
use crate::samples::SampleImage;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::fmt::Write;

pub const THUMBNAIL_SIZE: u32 = 120;

const STYLE: &str = r#"
body { background: #f5f5f5; font-family: system-ui, sans-serif; }
.block-container { max-width: 650px; margin: auto; padding-top: 2rem; }
.title { font-size: 2.5rem; font-weight: 800; color: #222; text-align: center; margin-bottom: 0.3rem; }
.subtitle { text-align: center; color: #666; font-size: 1rem; margin-bottom: 1.8rem; }
.upload-zone { display: block; border: 2px dashed #bfbfbf; border-radius: 14px; padding: 1.4rem; text-align: center; color: #777; font-size: 1rem; background: white; margin-bottom: 1rem; cursor: pointer; }
.upload-zone input { display: block; margin: 0.8rem auto 0; }
.sample-title { text-align: center; color: #888; margin-top: 1.4rem; margin-bottom: 0.7rem; font-size: 0.95rem; cursor: pointer; }
.sample-grid { display: grid; grid-template-columns: 1fr 1fr; gap: 1rem; justify-items: center; }
.sample-cell { text-align: center; }
.sample-img { border-radius: 12px; border: 1px solid #ddd; transition: 0.15s; }
.sample-img:hover { transform: scale(1.05); }
.preview { text-align: center; margin: 1rem 0; }
.preview img { max-width: 100%; border-radius: 12px; }
.preview figcaption { color: #888; font-size: 0.9rem; }
.classify-button { width: 100%; padding: 0.75rem; border-radius: 12px; background: #4CAF50; color: white; border: none; font-weight: 600; transition: 0.15s; cursor: pointer; }
.classify-button:hover { background: #45a047; }
.result-card { background: white; border-radius: 14px; padding: 1.4rem; margin-top: 1.3rem; box-shadow: 0px 2px 15px rgba(0,0,0,0.1); text-align: center; }
.result-label { font-size: 1.4rem; font-weight: 700; }
.error-card { background: white; border-left: 6px solid #E53935; border-radius: 14px; padding: 1.4rem; margin-top: 1.3rem; color: #444; }
"#;

/// Image previewed above the classify button or the result card.
#[derive(Clone, Debug, PartialEq)]
pub struct Preview {
    /// URL or `data:` URI of the image.
    pub src: String,
    /// Hidden form value that re-selects a sample, if the preview is one.
    pub sample_index: Option<usize>,
}

impl Preview {
    pub fn sample(sample: &SampleImage) -> Self {
        Self {
            src: format!("/samples/{}", sample.index),
            sample_index: Some(sample.index),
        }
    }

    /// Embeds uploaded bytes so the result page needs no second request.
    pub fn inline(bytes: &[u8], content_type: &str) -> Self {
        Self {
            src: format!("data:{content_type};base64,{}", STANDARD.encode(bytes)),
            sample_index: None,
        }
    }
}

/// Landing page, optionally with a sample already selected.
pub fn render_index(samples: &[SampleImage], selected: Option<&SampleImage>) -> String {
    let preview = selected.map(Preview::sample);
    let body = format!(
        "{}{}",
        classify_form(preview.as_ref()),
        sample_grid(samples)
    );
    page(&body)
}

/// Page shown after a classification.
///
/// A sample can be classified again from the same form. An upload is not kept
/// by the server, so its preview stands alone with a link back to the upload zone.
pub fn render_result(samples: &[SampleImage], preview: &Preview, prediction: &Prediction) -> String {
    let head = match preview.sample_index {
        Some(_) => classify_form(Some(preview)),
        None => preview_figure(preview),
    };
    let mut body = format!("{head}{}", result_card(prediction));
    if preview.sample_index.is_none() {
        body.push_str("<p class='subtitle'><a href='/'>classify another image</a></p>");
    }
    body.push_str(&sample_grid(samples));
    page(&body)
}

pub fn render_error(status: &str, message: &str) -> String {
    let body = format!(
        "<div class='error-card'><b>{}</b><p>{}</p><p><a href='/'>back</a></p></div>",
        escape_html(status),
        escape_html(message)
    );
    page(&body)
}

pub fn result_card(prediction: &Prediction) -> String {
    format!(
        "<div class='result-card'>\
         <span class='result-label' style='color:{color};'>{label}</span>\
         <p style='margin-top:0.6rem;color:#444;'>confidence: <b>{confidence}</b></p>\
         </div>",
        color = prediction.category.color(),
        label = prediction.category.display_label(),
        confidence = prediction.confidence_display(),
    )
}

fn page(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\
         <html lang='en'><head><meta charset='utf-8'>\
         <meta name='viewport' content='width=device-width, initial-scale=1'>\
         <title>Waste Classification</title>\
         <link rel='icon' href=\"data:image/svg+xml,<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 100 100'><text y='.9em' font-size='90'>♻️</text></svg>\">\
         <style>{STYLE}</style></head><body><main class='block-container'>\
         <h1 class='title'>♻ waste classifier</h1>\
         <p class='subtitle'>fastai • pytorch • resnet18 • v4 model</p>\
         {body}</main></body></html>"
    )
}

fn classify_form(preview: Option<&Preview>) -> String {
    let mut html = String::from(
        "<form method='post' action='/classify' enctype='multipart/form-data'>\
         <label class='upload-zone'>",
    );
    if preview.is_none() {
        html.push_str("drag &amp; drop an image here<br>or tap to upload");
    }
    html.push_str("<input type='file' name='file' accept='.jpg,.jpeg,.png'></label>");

    if let Some(preview) = preview {
        if let Some(index) = preview.sample_index {
            let _ = write!(html, "<input type='hidden' name='sample' value='{index}'>");
        }
        html.push_str(&preview_figure(preview));
    }

    html.push_str("<button class='classify-button' type='submit'>classify image 🔍</button></form>");
    html
}

fn preview_figure(preview: &Preview) -> String {
    format!(
        "<figure class='preview'><img src='{}' alt='preview'><figcaption>preview</figcaption></figure>",
        escape_html(&preview.src)
    )
}

fn sample_grid(samples: &[SampleImage]) -> String {
    if samples.is_empty() {
        return String::new();
    }

    let mut html = String::from(
        "<details><summary class='sample-title'>try sample images (tap to open)</summary>\
         <div class='sample-grid'>",
    );
    for sample in samples {
        let _ = write!(
            html,
            "<div class='sample-cell'>\
             <img class='sample-img' src='/samples/{index}/thumbnail' width='{size}' height='{size}' alt='{name}'>\
             <p><a href='/?sample={index}'>use this</a></p></div>",
            index = sample.index,
            size = THUMBNAIL_SIZE,
            name = escape_html(&sample.name),
        );
    }
    html.push_str("</div></details>");
    html
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::WasteCategory;
    use std::path::PathBuf;

    fn sample(index: usize, name: &str) -> SampleImage {
        SampleImage {
            index,
            name: name.to_string(),
            path: PathBuf::from(name),
        }
    }

    fn prediction(category: WasteCategory, probabilities: Vec<f32>, index: usize) -> Prediction {
        Prediction {
            label: category.as_str().to_string(),
            index,
            probabilities,
            category,
        }
    }

    #[test]
    fn index_without_selection_shows_upload_hint() {
        let html = render_index(&[], None);
        assert!(html.contains("♻ waste classifier"));
        assert!(html.contains("drag &amp; drop an image here"));
        assert!(html.contains("classify image 🔍"));
        assert!(!html.contains("try sample images"));
        assert!(!html.contains("name='sample'"));
    }

    #[test]
    fn index_lists_samples_in_grid() {
        let samples = [sample(0, "apple.jpg"), sample(1, "can.png")];
        let html = render_index(&samples, None);
        assert!(html.contains("try sample images (tap to open)"));
        assert!(html.contains("/samples/1/thumbnail"));
        assert!(html.contains("href='/?sample=0'"));
        assert_eq!(html.matches("use this").count(), 2);
    }

    #[test]
    fn selected_sample_shows_preview_and_hidden_field() {
        let samples = [sample(0, "apple.jpg")];
        let html = render_index(&samples, Some(&samples[0]));
        assert!(html.contains("<input type='hidden' name='sample' value='0'>"));
        assert!(html.contains("<img src='/samples/0' alt='preview'>"));
        assert!(!html.contains("drag &amp; drop"));
    }

    #[test]
    fn result_card_for_biodegradable() {
        let card = result_card(&prediction(WasteCategory::Biodegradable, vec![0.8734, 0.1266], 0));
        assert!(card.contains("color:#4CAF50;"));
        assert!(card.contains("Biodegradable 🌱"));
        assert!(card.contains("confidence: <b>87.34%</b>"));
    }

    #[test]
    fn result_card_for_non_biodegradable() {
        let card = result_card(&prediction(WasteCategory::NonBiodegradable, vec![0.25, 0.75], 1));
        assert!(card.contains("color:#E53935;"));
        assert!(card.contains("Non-Biodegradable ♻️"));
        assert!(card.contains("<b>75.00%</b>"));
    }

    #[test]
    fn upload_result_has_no_form_to_resubmit() {
        let samples = [sample(0, "apple.jpg")];
        let preview = Preview::inline(b"abc", "image/png");
        let html = render_result(
            &samples,
            &preview,
            &prediction(WasteCategory::Biodegradable, vec![0.9, 0.1], 0),
        );
        assert!(html.contains("<img src='data:image/png;base64,YWJj' alt='preview'>"));
        assert!(html.contains("Biodegradable 🌱"));
        assert!(html.contains("<a href='/'>classify another image</a>"));
        assert!(!html.contains("<form"));
        assert!(!html.contains("classify image 🔍"));
        assert!(html.contains("href='/?sample=0'"));
    }

    #[test]
    fn sample_result_keeps_the_form_for_reclassifying() {
        let samples = [sample(0, "apple.jpg"), sample(1, "can.png")];
        let html = render_result(
            &samples,
            &Preview::sample(&samples[1]),
            &prediction(WasteCategory::NonBiodegradable, vec![0.2, 0.8], 1),
        );
        assert!(html.contains("<input type='hidden' name='sample' value='1'>"));
        assert!(html.contains("classify image 🔍"));
        assert!(html.contains("<b>80.00%</b>"));
        assert!(!html.contains("classify another image"));
    }

    #[test]
    fn inline_preview_is_a_data_uri() {
        let preview = Preview::inline(b"abc", "image/png");
        assert_eq!(preview.src, "data:image/png;base64,YWJj");
        assert_eq!(preview.sample_index, None);
    }

    #[test]
    fn user_text_is_escaped() {
        assert_eq!(
            escape_html("<b>\"x\" & 'y'</b>"),
            "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;"
        );
        let html = render_index(&[sample(0, "<script>.png")], None);
        assert!(html.contains("alt='&lt;script&gt;.png'"));
        assert!(!html.contains("<script>"));

        let error = render_error("Bad Request", "<oops>");
        assert!(error.contains("&lt;oops&gt;"));
    }
}
