//! Minimal RFC 4180 CSV: comma separated, fields containing a comma, quote
//! or line break are quoted with internal quotes doubled.

use std::borrow::Cow;
use std::io::{self, Write};
use std::iter::Peekable;
use std::str::Chars;

pub fn escape(field: &str) -> Cow<'_, str> {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Write one record terminated by `\n`.
pub fn write_record<W, I, S>(out: &mut W, fields: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut first = true;
    for field in fields {
        if !first {
            out.write_all(b",")?;
        }
        first = false;
        out.write_all(escape(field.as_ref()).as_bytes())?;
    }
    out.write_all(b"\n")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based line on which the record starts.
    pub line: usize,
    pub fields: Vec<String>,
}

impl Record {
    pub fn is_blank(&self) -> bool {
        self.fields.len() == 1 && self.fields[0].trim().is_empty()
    }
}

pub struct Records<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

/// Iterate the records of a CSV document, header included.
pub fn records(input: &str) -> Records<'_> {
    Records { chars: input.chars().peekable(), line: 1 }
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.chars.peek()?;
        let line = self.line;
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        while let Some(c) = self.chars.next() {
            if in_quotes {
                match c {
                    '"' if self.chars.peek() == Some(&'"') => {
                        self.chars.next();
                        field.push('"');
                    }
                    '"' => in_quotes = false,
                    '\n' => {
                        self.line += 1;
                        field.push(c);
                    }
                    _ => field.push(c),
                }
                continue;
            }
            match c {
                '"' if field.is_empty() => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut field)),
                '\r' if self.chars.peek() == Some(&'\n') => {}
                '\n' => {
                    self.line += 1;
                    fields.push(field);
                    return Some(Record { line, fields });
                }
                _ => field.push(c),
            }
        }
        fields.push(field);
        Some(Record { line, fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn parses_quoted_fields_and_multiline_records() {
        let input = "id,name\n0,\"a, b\"\n1,\"line\nbreak\"\r\n2,\"q\"\"uote\"\n";
        let rows: Vec<Record> = records(input).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].fields, vec!["0", "a, b"]);
        assert_eq!(rows[2].fields, vec!["1", "line\nbreak"]);
        assert_eq!(rows[3].line, 5);
        assert_eq!(rows[3].fields, vec!["2", "q\"uote"]);
    }

    #[test]
    fn written_records_parse_back() {
        let mut buf = Vec::new();
        write_record(&mut buf, ["x", "has,comma", "has \"quote\""]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let rows: Vec<Record> = records(&text).collect();
        assert_eq!(rows[0].fields, vec!["x", "has,comma", "has \"quote\""]);
    }

    #[test]
    fn blank_lines_are_flagged() {
        let rows: Vec<Record> = records("a\n\nb").collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].is_blank());
        assert_eq!(rows[2].line, 3);
    }
}
