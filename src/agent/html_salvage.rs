//! HTML salvage: when the task
//! reads as "build me a static HTML page/site" and the model answers in
//! prose with a fenced or bare HTML document instead of calling
//! `write_file`, pull the document out and write it ourselves rather
//! than burn an iteration nagging the model to use a tool.

const SITE_NOUNS: &[&str] = &["website", "site", "landing page", "web page", "webpage"];
const CREATE_VERBS: &[&str] = &["create", "build", "make", "generate", "write"];

/// True if `task` reads like a request for a static HTML artifact.
pub fn looks_like_html_site_request(task: &str) -> bool {
    let lower = task.to_lowercase();
    if !lower.contains("html") {
        return false;
    }
    let has_noun = SITE_NOUNS.iter().any(|n| lower.contains(n));
    let has_verb = CREATE_VERBS.iter().any(|v| lower.contains(v));
    has_noun && has_verb
}

/// Pull a full HTML document out of free-form model text: a fenced
/// ```html block first, else the substring from a `<!doctype html>` (or
/// `<html`) start tag to its matching close tag.
pub fn extract_html_document(text: &str) -> Option<String> {
    if let Some(doc) = extract_fenced_html(text) {
        return Some(doc);
    }
    extract_bare_html(text)
}

fn extract_fenced_html(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let fence_start = lower.find("```html")?;
    let body_start = fence_start + "```html".len();
    let rest = &text[body_start..];
    let rest_lower = &lower[body_start..];
    let fence_end = rest_lower.find("```")?;
    let doc = rest[..fence_end].trim();
    if doc.is_empty() {
        None
    } else {
        Some(doc.to_string())
    }
}

fn extract_bare_html(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let start = lower.find("<!doctype html").or_else(|| lower.find("<html"))?;
    let end = lower.rfind("</html>").map(|i| i + "</html>".len())?;
    if end <= start {
        return None;
    }
    Some(text[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_site_build_request() {
        assert!(looks_like_html_site_request("Create a simple HTML landing page for a bakery"));
        assert!(looks_like_html_site_request("build me an html website with a contact form"));
    }

    #[test]
    fn does_not_flag_unrelated_task() {
        assert!(!looks_like_html_site_request("Fix the null pointer bug in parser.c"));
        assert!(!looks_like_html_site_request("Explain what html tables are"));
    }

    #[test]
    fn extracts_fenced_html_block() {
        let text = "Sure, here you go:\n```html\n<!doctype html>\n<html><body>Hi</body></html>\n```\nLet me know!";
        let doc = extract_html_document(text).unwrap();
        assert!(doc.starts_with("<!doctype html>"));
        assert!(doc.ends_with("</html>"));
    }

    #[test]
    fn extracts_bare_html_document() {
        let text = "<!DOCTYPE html>\n<html>\n<head></head>\n<body>hi</body>\n</html>\ntrailing prose";
        let doc = extract_html_document(text).unwrap();
        assert!(doc.to_lowercase().starts_with("<!doctype html>"));
        assert!(doc.ends_with("</html>"));
    }

    #[test]
    fn returns_none_when_no_document_present() {
        assert!(extract_html_document("I need more information before I can proceed.").is_none());
    }
}
