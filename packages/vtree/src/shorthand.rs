//! Hyperscript tag shorthand: `tag.class.other#id`.

/// A parsed `tag.class#id` shorthand.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Shorthand {
    /// Lowercased tag name, `div` when omitted.
    pub tag: String,
    /// Classes in source order.
    pub classes: Vec<String>,
    /// The last `#id` segment, if any.
    pub id: Option<String>,
}

impl Shorthand {
    /// Parse a shorthand string.
    ///
    /// Empty segments are ignored, so `"p..note"` and `"p.note"` parse the
    /// same. The tag defaults to `div`.
    ///
    /// ```rust
    /// use cycle_vtree::Shorthand;
    ///
    /// let s = Shorthand::parse("LI.item.done#first");
    /// assert_eq!(s.tag, "li");
    /// assert_eq!(s.classes, vec!["item", "done"]);
    /// assert_eq!(s.id.as_deref(), Some("first"));
    ///
    /// assert_eq!(Shorthand::parse(".box").tag, "div");
    /// ```
    pub fn parse(s: &str) -> Self {
        let mut parsed = Shorthand::default();
        let mut segments = split_segments(s);

        let tag = match segments.first() {
            Some((None, name)) => {
                let tag = name.to_ascii_lowercase();
                segments.remove(0);
                tag
            }
            _ => String::new(),
        };
        parsed.tag = if tag.is_empty() { "div".to_string() } else { tag };

        for (marker, name) in segments {
            if name.is_empty() {
                continue;
            }
            match marker {
                Some('.') => parsed.classes.push(name.to_string()),
                Some('#') => parsed.id = Some(name.to_string()),
                _ => {}
            }
        }
        parsed
    }
}

/// Split at `.` and `#`, keeping the marker that introduced each segment.
fn split_segments(s: &str) -> Vec<(Option<char>, &str)> {
    let mut segments = Vec::new();
    let mut marker = None;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if c == '.' || c == '#' {
            segments.push((marker, &s[start..i]));
            marker = Some(c);
            start = i + c.len_utf8();
        }
    }
    segments.push((marker, &s[start..]));
    segments
}
