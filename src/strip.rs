//! HTML tag stripping for the `strip` template helper.
//!
//! A small cursor over the markup that keeps character data and drops:
//! - tags (attributes may contain `>` inside quotes)
//! - comments, doctypes and processing instructions
//! - the contents of `<script>` and `<style>` elements
//!
//! Character references are left untouched; the `strip` helper removes the
//! `&nbsp;` artifact afterwards.

/// Remove every HTML tag from `html`, returning only its text content.
pub fn strip_tags(html: &str) -> String {
    let mut stripper = Stripper::new(html);
    stripper.run();
    stripper.out
}

/// Elements whose content is never text.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

struct Stripper<'a> {
    input: &'a str,
    pos: usize,
    out: String,
}

impl<'a> Stripper<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            out: String::with_capacity(input.len()),
        }
    }

    fn run(&mut self) {
        while !self.eof() {
            if self.starts_with("<!--") {
                self.skip_past("-->");
            } else if self.starts_with("<!") || self.starts_with("<?") {
                self.skip_past(">");
            } else if self.at_tag_start() {
                let name = self.skip_tag();
                if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    self.skip_raw_text(&name);
                }
            } else {
                let c = self.current_char();
                self.out.push(c);
                self.pos += c.len_utf8();
            }
        }
    }

    /// `<` followed by a letter or `/` opens a tag; anything else is text.
    fn at_tag_start(&self) -> bool {
        let mut chars = self.input[self.pos..].chars();
        chars.next() == Some('<')
            && matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '/')
    }

    /// Consume a whole tag and return its lower-cased name. Closing tags
    /// return an empty name.
    fn skip_tag(&mut self) -> String {
        self.advance(1); // '<'
        let closing = self.starts_with("/");
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' || c == '/' {
                self.advance(1);
            } else {
                break;
            }
        }
        let name = self.input[start..self.pos].to_ascii_lowercase();

        let mut quote: Option<char> = None;
        while !self.eof() {
            let c = self.current_char();
            self.advance(1);
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '>') => break,
                _ => {}
            }
        }

        if closing {
            String::new()
        } else {
            name.trim_end_matches('/').to_string()
        }
    }

    /// Skip everything up to and including `</name>`.
    fn skip_raw_text(&mut self, name: &str) {
        let close = format!("</{name}");
        let rest = self.input[self.pos..].to_ascii_lowercase();
        match rest.find(&close) {
            Some(offset) => {
                self.pos += offset;
                self.skip_tag();
            }
            None => self.pos = self.input.len(),
        }
    }

    fn skip_past(&mut self, marker: &str) {
        match self.input[self.pos..].find(marker) {
            Some(offset) => self.pos += offset + marker.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self, n: usize) {
        // Advance by `n` characters (not bytes).
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_simple_tags() {
        assert_eq!(strip_tags("<b>Hi</b> <i>there</i>"), "Hi there");
    }

    #[test]
    fn keeps_character_references() {
        assert_eq!(strip_tags("<p>a&nbsp;b &amp; c</p>"), "a&nbsp;b &amp; c");
    }

    #[test]
    fn quoted_angle_brackets_stay_inside_the_tag() {
        assert_eq!(strip_tags(r#"<a title="x > y" href='z'>link</a>"#), "link");
    }

    #[test]
    fn drops_comments_and_doctype() {
        assert_eq!(
            strip_tags("<!DOCTYPE html><!-- hidden <b>x</b> -->shown"),
            "shown"
        );
    }

    #[test]
    fn drops_script_and_style_contents() {
        let html = "<style>p { color: red }</style>A<SCRIPT>if (a < b) {}</SCRIPT>B";
        assert_eq!(strip_tags(html), "AB");
    }

    #[test]
    fn lone_less_than_is_text() {
        assert_eq!(strip_tags("1 < 2 <br/>ok"), "1 < 2 ok");
    }

    #[test]
    fn unterminated_tag_is_dropped() {
        assert_eq!(strip_tags("text<div class=\"x"), "text");
    }

    #[test]
    fn multibyte_text_survives() {
        assert_eq!(strip_tags("<p>Grüße – 日本</p>"), "Grüße – 日本");
    }
}
