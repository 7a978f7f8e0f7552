//! Streaming tokenizer
//!
//! Splits the raw database source on ASCII whitespace and strips `$( ... $)`
//! comments before anything downstream ever sees a token. The tokenizer
//! itself is the only component that understands comment nesting rules (it
//! does not nest) and line tracking; everything else just gets a flat
//! `Token` stream.

use thiserror::Error;

/// Errors raised while splitting the source into a token stream.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TokenizeError {
    #[error("line {line}: unterminated comment (missing matching $))")]
    UnterminatedComment { line: usize },
    #[error("line {line}: '$' is not allowed inside a token ({token:?})")]
    DollarInToken { line: usize, token: String },
    #[error("line {line}: unexpected '$)' with no matching '$('")]
    UnmatchedCommentEnd { line: usize },
    #[error("line {line}: '{token}' is not a recognized '$' marker")]
    UnknownMarker { line: usize, token: String },
}

/// The complete set of `$`-prefixed tokens the grammar recognizes once
/// comment delimiters (consumed earlier in the same pass) are excluded.
const MARKERS: [&str; 11] = ["${", "$}", "$c", "$v", "$d", "$f", "$e", "$a", "$p", "$=", "$."];

/// One whitespace-delimited token, with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub line: usize,
}

/// Splits `source` into a comment-free token stream.
///
/// Whitespace-splitting and comment-stripping happen in the same pass: a
/// `$(` token switches the tokenizer into comment mode until a `$)` token is
/// seen, and every token in between (including further `$(`/`$)`-looking
/// text, since comments do not nest) is discarded.
pub fn tokenize(source: &str) -> Result<Vec<Token>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut in_comment = false;
    let mut comment_started_line = 0;

    for (line_idx, line) in source.lines().enumerate() {
        let line = line_idx + 1;
        for text in line.split_ascii_whitespace() {
            if text == "$(" {
                if in_comment {
                    // Comments don't nest; a second "$(" is just more
                    // (discarded) comment content, not an error.
                    continue;
                }
                in_comment = true;
                comment_started_line = line;
                continue;
            }
            if text == "$)" {
                if !in_comment {
                    return Err(TokenizeError::UnmatchedCommentEnd { line });
                }
                in_comment = false;
                continue;
            }
            if in_comment {
                continue;
            }
            if text.len() > 1 && text.as_bytes()[0] != b'$' && text.contains('$') {
                return Err(TokenizeError::DollarInToken { line, token: text.to_string() });
            }
            if text.starts_with('$') && !MARKERS.contains(&text) {
                return Err(TokenizeError::UnknownMarker { line, token: text.to_string() });
            }
            tokens.push(Token { text: text.to_string(), line });
        }
    }

    if in_comment {
        return Err(TokenizeError::UnterminatedComment { line: comment_started_line });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments() {
        let toks = tokenize("$c wff $. $( a comment $) $v ph $.").unwrap();
        let texts: Vec<_> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["$c", "wff", "$.", "$v", "ph", "$."]);
    }

    #[test]
    fn unterminated_comment_is_fatal() {
        let err = tokenize("$( never closed").unwrap_err();
        assert_eq!(err, TokenizeError::UnterminatedComment { line: 1 });
    }

    #[test]
    fn unmatched_comment_end_is_fatal() {
        let err = tokenize("$) $c wff $.").unwrap_err();
        assert_eq!(err, TokenizeError::UnmatchedCommentEnd { line: 1 });
    }

    #[test]
    fn dollar_inside_token_is_fatal() {
        let err = tokenize("wp$h").unwrap_err();
        assert!(matches!(err, TokenizeError::DollarInToken { .. }));
    }

    #[test]
    fn unrecognized_dollar_marker_is_fatal() {
        let err = tokenize("wph $f wff $z $.").unwrap_err();
        assert_eq!(err, TokenizeError::UnknownMarker { line: 1, token: "$z".to_string() });
    }

    #[test]
    fn tracks_line_numbers_across_multiple_lines() {
        let toks = tokenize("$c wff $.\n$v ph $.").unwrap();
        assert_eq!(toks[0].line, 1);
        assert_eq!(toks.last().unwrap().line, 2);
    }
}
