use once_cell::sync::Lazy;
use regex::{ Captures, Regex };

static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mR)^(#{1,3})[ \t]+(.+?)[ \t]*$").expect("heading pattern is valid")
});
static BOLD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*([^*\n]+?)\*\*").expect("bold pattern is valid")
});
static ITALIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*([^*\n]+?)\*").expect("italic pattern is valid")
});

/// Rewrites markdown headings (levels 1-3) and emphasis into HTML tags.
/// Bold runs before italic so `**x**` never turns into nested `<i>`.
pub fn markdown_to_markup(text: &str) -> String {
    let headed = HEADING.replace_all(text, |caps: &Captures| {
        let level = caps[1].len();
        format!("<h{level}>{}</h{level}>", &caps[2])
    });
    let bolded = BOLD.replace_all(&headed, "<b>$1</b>");
    ITALIC.replace_all(&bolded, "<i>$1</i>").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_heading_levels() {
        let text = "# Title\n## Section\n### Detail\nbody";
        assert_eq!(
            markdown_to_markup(text),
            "<h1>Title</h1>\n<h2>Section</h2>\n<h3>Detail</h3>\nbody"
        );
    }

    #[test]
    fn crlf_stays_outside_heading_tags() {
        assert_eq!(
            markdown_to_markup("# Title\r\n## Section \r\nbody"),
            "<h1>Title</h1>\r\n<h2>Section</h2>\r\nbody"
        );
    }

    #[test]
    fn leaves_deeper_headings_and_inline_hashes_alone() {
        assert_eq!(markdown_to_markup("#### Too deep"), "#### Too deep");
        assert_eq!(markdown_to_markup("Order #42 ships"), "Order #42 ships");
    }

    #[test]
    fn converts_bold_before_italic() {
        assert_eq!(
            markdown_to_markup("A **logo** costs *about* 100"),
            "A <b>logo</b> costs <i>about</i> 100"
        );
    }

    #[test]
    fn heading_with_emphasis() {
        assert_eq!(markdown_to_markup("## **Prices**"), "<h2><b>Prices</b></h2>");
    }

    #[test]
    fn unmatched_markers_are_kept() {
        assert_eq!(markdown_to_markup("5 * 3 = 15"), "5 * 3 = 15");
        assert_eq!(markdown_to_markup("plain text"), "plain text");
    }
}
