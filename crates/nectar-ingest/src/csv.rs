//! Minimal CSV writing for staging files.

use std::io::Write;

/// Quote a field if it contains a comma, quote, or line break. Embedded
/// quotes are doubled.
pub fn quote_field(value: &str) -> String {
    let needs_quoting = value.contains([',', '"', '\n', '\r']);
    if needs_quoting {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Write one record terminated by `\n`.
pub fn write_record<W: Write, S: AsRef<str>>(out: &mut W, fields: &[S]) -> std::io::Result<()> {
    let line: Vec<String> = fields.iter().map(|f| quote_field(f.as_ref())).collect();
    writeln!(out, "{}", line.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_are_untouched() {
        assert_eq!(quote_field("203.0.113.5"), "203.0.113.5");
        assert_eq!(quote_field(""), "");
    }

    #[test]
    fn special_characters_are_quoted() {
        assert_eq!(quote_field("a,b"), "\"a,b\"");
        assert_eq!(quote_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(quote_field("GET /\r\nHost: x"), "\"GET /\r\nHost: x\"");
    }

    #[test]
    fn record_is_comma_joined() {
        let mut out = Vec::new();
        write_record(&mut out, &["1", "x,y", ""]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1,\"x,y\",\n");
    }
}
