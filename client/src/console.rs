//! Splitting of lines typed at the watch console.

/// Error from [`split_line`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("Unterminated quote")]
    UnterminatedQuote,
}

/// Split a line into arguments on whitespace.
///
/// Single or double quotes group words into one argument, and a backslash
/// inside double quotes escapes the next character.
pub fn split_line(line: &str) -> Result<Vec<String>, LineError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                in_arg = true;
                let quote = c;
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some('\\') if quote == '"' => match chars.next() {
                            Some(escaped) => current.push(escaped),
                            None => return Err(LineError::UnterminatedQuote),
                        },
                        Some(c) => current.push(c),
                        None => return Err(LineError::UnterminatedQuote),
                    }
                }
            }
            c if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            c => {
                in_arg = true;
                current.push(c);
            }
        }
    }
    if in_arg {
        args.push(current);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_words() {
        assert_eq!(split_line("  resolve 5   keep-local ").unwrap(), ["resolve", "5", "keep-local"]);
        assert!(split_line("   ").unwrap().is_empty());
    }

    #[test]
    fn quoted_arguments() {
        assert_eq!(
            split_line(r#"add "Stay hungry, stay foolish." 'Life advice'"#).unwrap(),
            ["add", "Stay hungry, stay foolish.", "Life advice"]
        );
    }

    #[test]
    fn escapes_and_empty_quotes() {
        assert_eq!(
            split_line(r#"add "He said \"go\"" """#).unwrap(),
            ["add", r#"He said "go""#, ""]
        );
        assert_eq!(split_line(r"add 'C:\dir' x").unwrap(), ["add", r"C:\dir", "x"]);
    }

    #[test]
    fn adjacent_quotes_join() {
        assert_eq!(split_line(r#"ab"c d"e"#).unwrap(), ["abc de"]);
    }

    #[test]
    fn unterminated() {
        assert_eq!(split_line(r#"add "oops"#), Err(LineError::UnterminatedQuote));
        assert_eq!(split_line(r#"add "trailing\"#), Err(LineError::UnterminatedQuote));
    }
}
