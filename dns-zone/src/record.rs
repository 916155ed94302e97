use crate::error::FormatError;

/// A single authoritative record: §3 `ResourceRecord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    pub value: String,
    pub rr_class: String,
    pub rr_type: String,
    pub ttl: u32,
}

impl ResourceRecord {
    pub const DEFAULT_CLASS: &'static str = "IN";
    pub const DEFAULT_TYPE: &'static str = "NS";
    pub const DEFAULT_TTL: u32 = 300;
}

/// Splits a zone line into whitespace/tab-delimited tokens, with
/// double-quoted segments preserved verbatim (including internal
/// whitespace) as a single token. Empty tokens are discarded.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if c.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn is_purely_numeric(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// Parses one zone-file line into a [`ResourceRecord`] per §4.2: first
/// token is `name`, last is `value`, the first purely numeric token
/// strictly between them is `ttl`, and whatever's left (in order) supplies
/// `rr_class`/`rr_type` with the documented fallbacks.
pub fn parse_line(line: &str) -> Result<ResourceRecord, FormatError> {
    let tokens = tokenize(line);
    if tokens.len() < 2 {
        return Err(FormatError::TooFewTokens {
            line: line.to_string(),
            found: tokens.len(),
        });
    }

    let name = tokens.first().cloned().unwrap();
    let value = tokens.last().cloned().unwrap();
    let middle = &tokens[1..tokens.len() - 1];

    let ttl_index = middle.iter().position(|token| is_purely_numeric(token));
    let ttl = ttl_index
        .map(|idx| middle[idx].parse::<u32>().expect("checked purely numeric"))
        .unwrap_or(ResourceRecord::DEFAULT_TTL);

    let remaining: Vec<&String> = middle
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != ttl_index)
        .map(|(_, token)| token)
        .collect();

    let (rr_class, rr_type) = match remaining.len() {
        0 => (
            ResourceRecord::DEFAULT_CLASS.to_string(),
            ResourceRecord::DEFAULT_TYPE.to_string(),
        ),
        1 => (ResourceRecord::DEFAULT_CLASS.to_string(), remaining[0].clone()),
        _ => (remaining[0].clone(), remaining[remaining.len() - 1].clone()),
    };

    Ok(ResourceRecord {
        name,
        value,
        rr_class,
        rr_type,
        ttl,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tab_separated_line_with_ttl() {
        let record = parse_line("windows.pcpools.fuberlin\tIN\t60\tA\t127.0.0.17").unwrap();
        assert_eq!(record.name, "windows.pcpools.fuberlin");
        assert_eq!(record.rr_class, "IN");
        assert_eq!(record.ttl, 60);
        assert_eq!(record.rr_type, "A");
        assert_eq!(record.value, "127.0.0.17");
    }

    #[test]
    fn defaults_class_and_ttl_when_only_type_given() {
        let record = parse_line("fuberlin A 127.0.0.15").unwrap();
        assert_eq!(record.rr_class, "IN");
        assert_eq!(record.rr_type, "A");
        assert_eq!(record.ttl, ResourceRecord::DEFAULT_TTL);
    }

    #[test]
    fn defaults_both_when_only_name_and_value_given() {
        let record = parse_line("fuberlin 127.0.0.15").unwrap();
        assert_eq!(record.rr_class, ResourceRecord::DEFAULT_CLASS);
        assert_eq!(record.rr_type, ResourceRecord::DEFAULT_TYPE);
    }

    #[test]
    fn quoted_segments_preserve_whitespace() {
        let record = parse_line(r#"fuberlin "a long value" A 127.0.0.15"#).unwrap();
        assert_eq!(record.rr_type, "A");
        assert_eq!(record.value, "127.0.0.15");
        // the quoted token sits strictly between name and value
        assert_eq!(record.rr_class, "a long value");
    }

    #[test]
    fn rejects_single_token_line() {
        let err = parse_line("fuberlin").unwrap_err();
        assert!(matches!(err, FormatError::TooFewTokens { found: 1, .. }));
    }

    #[test]
    fn blank_line_is_rejected() {
        let err = parse_line("   ").unwrap_err();
        assert!(matches!(err, FormatError::TooFewTokens { found: 0, .. }));
    }
}
