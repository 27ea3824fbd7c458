use std::panic;

use super::ExtractionError;

/// Concatenate the text of every page, each followed by a newline, in page order.
pub(super) fn extract(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed documents instead of returning an error.
    let pages = panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|payload| ExtractionError::Pdf(panic_message(payload.as_ref())))?
        .map_err(|error| ExtractionError::Pdf(error.to_string()))?;

    tracing::debug!(pages = pages.len(), "Extracted PDF pages");
    Ok(join_pages(pages))
}

fn join_pages(pages: Vec<String>) -> String {
    let mut text = String::with_capacity(pages.iter().map(|page| page.len() + 1).sum());
    for page in pages {
        text.push_str(&page);
        text.push('\n');
    }
    text
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "parser aborted".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal two-page PDF with one line of Helvetica text per page.
    fn two_page_pdf() -> Vec<u8> {
        let streams = [
            "BT /F1 24 Tf 72 720 Td (First page) Tj ET",
            "BT /F1 24 Tf 72 720 Td (Second page) Tj ET",
        ];
        let objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 5 0 R >> >> /Contents 6 0 R >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 5 0 R >> >> /Contents 7 0 R >>".to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
            format!("<< /Length {} >>\nstream\n{}\nendstream", streams[0].len(), streams[0]),
            format!("<< /Length {} >>\nstream\n{}\nendstream", streams[1].len(), streams[1]),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (index, object) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            let object = format!("{} 0 obj\n{object}\nendobj\n", index + 1);
            pdf.extend_from_slice(object.as_bytes());
        }
        let xref_at = pdf.len();
        pdf.extend_from_slice(
            format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes(),
        );
        for offset in offsets {
            pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
                objects.len() + 1
            )
            .as_bytes(),
        );
        pdf
    }

    #[test]
    fn pages_are_extracted_in_order() {
        let text = extract(&two_page_pdf()).expect("valid pdf");
        let first = text.find("First page").expect("first page text");
        let second = text.find("Second page").expect("second page text");
        assert!(first < second);
        assert!(text.ends_with('\n'));
        assert!(text[first..second].contains('\n'));
    }

    #[test]
    fn each_page_is_followed_by_a_newline() {
        let joined = join_pages(vec!["one".into(), String::new(), "three".into()]);
        assert_eq!(joined, "one\n\nthree\n");
        assert_eq!(join_pages(Vec::new()), "");
    }

    #[test]
    fn garbage_payload_is_an_error_not_a_panic() {
        let result = extract(b"%PDF-1.4\nthis is not really a pdf");
        assert!(matches!(result, Err(ExtractionError::Pdf(_))));
    }

    #[test]
    fn panic_payloads_render_as_text() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("bad xref");
        assert_eq!(panic_message(boxed.as_ref()), "bad xref");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bad trailer"));
        assert_eq!(panic_message(boxed.as_ref()), "bad trailer");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "parser aborted");
    }
}
