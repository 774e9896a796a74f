//! Lexing primitives for STABS strings.

use std::fmt;

/// A cursor over the bytes of a single STABS string.
///
/// All of the `eat_*` functions advance the cursor past whatever they consume
/// and leave it in place when they fail, except where noted.
#[derive(Clone)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    /// Starts a new cursor at the beginning of a string.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// The byte offset from the start of the string.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Moves the cursor back to a position previously returned by
    /// [`Cursor::offset`].
    pub fn rewind(&mut self, offset: usize) {
        debug_assert!(offset <= self.bytes.len());
        self.offset = offset;
    }

    /// Indicates whether the entire string has been consumed.
    pub fn is_empty(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    /// The bytes that have not yet been consumed.
    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.offset.min(self.bytes.len())..]
    }

    /// Returns the next byte without advancing.
    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    /// Checks whether the remaining input starts with the given bytes.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.remaining().starts_with(prefix)
    }

    /// Advances past `count` bytes. Must not run off the end of the string.
    pub fn skip(&mut self, count: usize) {
        debug_assert!(self.offset + count <= self.bytes.len());
        self.offset += count;
    }

    /// Consumes the rest of the string.
    pub fn skip_to_end(&mut self) {
        self.offset = self.bytes.len();
    }

    /// Returns the next byte and advances, or `None` at the end of the string.
    pub fn eat_char(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.offset += 1;
        Some(byte)
    }

    /// Consumes a decimal integer literal, optionally signed. Fails without
    /// advancing if no digits were consumed.
    pub fn eat_s64_literal(&mut self) -> Option<i64> {
        let start = self.offset;
        let negative = match self.peek() {
            Some(b'-') => {
                self.offset += 1;
                true
            }
            Some(b'+') => {
                self.offset += 1;
                false
            }
            _ => false,
        };
        let mut value: i64 = 0;
        let mut digits = 0;
        while let Some(byte) = self.peek() {
            if !byte.is_ascii_digit() {
                break;
            }
            value = value
                .saturating_mul(10)
                .saturating_add((byte - b'0') as i64);
            digits += 1;
            self.offset += 1;
        }
        if digits == 0 {
            self.offset = start;
            return None;
        }
        Some(if negative { -value } else { value })
    }

    /// Consumes a decimal integer literal and truncates it to 32 bits, which
    /// is how values such as `4294967295` in range bounds end up negative.
    pub fn eat_s32_literal(&mut self) -> Option<i32> {
        self.eat_s64_literal().map(|value| value as i32)
    }

    /// Consumes an identifier up to the first `:` or `;`.
    ///
    /// The first character may be any byte other than the terminators, so
    /// names beginning with `$`, `_` or an operator sigil are accepted. Fails
    /// if the end of the string is reached before a terminator.
    pub fn eat_stabs_identifier(&mut self) -> Option<String> {
        let mut identifier = String::new();
        while let Some(byte) = self.peek() {
            if byte == b':' || byte == b';' {
                return Some(identifier);
            }
            identifier.push(byte as char);
            self.offset += 1;
        }
        None
    }

    /// Consumes an identifier that may contain an unescaped namespace
    /// separator `::` inside template brackets, even though the field
    /// terminator is itself a colon.
    ///
    /// Reaching the end of the string before a terminator produces a
    /// distinguished truncation error so that callers can tolerate the GCC
    /// bug that cut long symbol strings short.
    pub fn eat_dodgy_stabs_identifier(&mut self) -> Result<String, ParseError> {
        let mut identifier = String::new();
        let mut template_depth: i32 = 0;
        while let Some(byte) = self.peek() {
            match byte {
                b'<' => template_depth += 1,
                b'>' => template_depth -= 1,
                _ => {}
            }
            let valid = (byte != b':' || template_depth != 0) && byte != b';';
            if !valid {
                return Ok(identifier);
            }
            identifier.push(byte as char);
            self.offset += 1;
        }
        Err(ParseError::truncated(self.offset))
    }

    /// Consumes one byte and checks that it matches. The context tag ends up
    /// in the error message.
    pub fn expect_char(&mut self, expected: u8, context: &str) -> Result<(), ParseError> {
        match self.eat_char() {
            Some(byte) if byte == expected => Ok(()),
            got => Err(ParseError::expected(self.offset, expected, got, context)),
        }
    }

    /// Fails with a malformed-input error at the current position.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.offset, message)
    }
}

/// Distinguishes recoverable truncation from ordinary malformed input.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParseErrorKind {
    /// The input did not match the grammar.
    Malformed,
    /// The string ended in the middle of an identifier. Old GCC versions
    /// truncated long symbol strings, so this usually isn't the only damaged
    /// symbol in the translation unit.
    Truncated,
}

/// A parse error at a specific cursor position.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseError {
    /// Whether this is ordinary malformed input or a truncated string.
    pub kind: ParseErrorKind,
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Byte offset into the symbol string.
    pub offset: usize,
    /// The byte the parser wanted, if it wanted a specific one.
    pub expected: Option<char>,
    /// The byte it got instead, if any.
    pub got: Option<u8>,
}

impl ParseError {
    /// Creates a malformed-input error.
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        let error = Self {
            kind: ParseErrorKind::Malformed,
            message: message.into(),
            offset,
            expected: None,
            got: None,
        };
        log::trace!("parse error: {}", error);
        error
    }

    /// Creates an error for a mismatched single byte.
    pub fn expected(offset: usize, expected: u8, got: Option<u8>, context: &str) -> Self {
        let mut error = Self::new(offset, format!("Expected '{}' in {}.", expected as char, context));
        error.expected = Some(expected as char);
        error.got = got;
        error
    }

    /// Creates the distinguished truncation error.
    pub fn truncated(offset: usize) -> Self {
        Self {
            kind: ParseErrorKind::Truncated,
            message: "Symbol string truncated.".to_string(),
            offset,
            expected: None,
            got: None,
        }
    }

    /// Whether this error was caused by a truncated symbol string.
    pub fn is_truncated(&self) -> bool {
        self.kind == ParseErrorKind::Truncated
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(got) = self.got {
            if got.is_ascii_graphic() {
                write!(f, " Got '{}' ({:#04x}).", got as char, got)?;
            } else {
                write!(f, " Got {:#04x}.", got)?;
            }
        }
        write!(f, " (offset {})", self.offset)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eat_char() {
        let mut cursor = Cursor::new(b"ab");
        assert_eq!(cursor.eat_char(), Some(b'a'));
        assert_eq!(cursor.eat_char(), Some(b'b'));
        assert_eq!(cursor.eat_char(), None);
    }

    #[test]
    fn integer_literals() {
        let mut cursor = Cursor::new(b"123,-456;");
        assert_eq!(cursor.eat_s32_literal(), Some(123));
        cursor.skip(1);
        assert_eq!(cursor.eat_s64_literal(), Some(-456));
        assert_eq!(cursor.eat_s32_literal(), None);
        assert_eq!(cursor.peek(), Some(b';'));
    }

    #[test]
    fn integer_literal_truncates_to_32_bits() {
        let mut cursor = Cursor::new(b"4294967295");
        assert_eq!(cursor.eat_s32_literal(), Some(-1));
    }

    #[test]
    fn no_digits_does_not_advance() {
        let mut cursor = Cursor::new(b"-x");
        assert_eq!(cursor.eat_s32_literal(), None);
        assert_eq!(cursor.peek(), Some(b'-'));
    }

    #[test]
    fn plain_identifier() {
        let mut cursor = Cursor::new(b"$vf0:rest");
        assert_eq!(cursor.eat_stabs_identifier().as_deref(), Some("$vf0"));
        assert_eq!(cursor.peek(), Some(b':'));
    }

    #[test]
    fn unterminated_identifier() {
        let mut cursor = Cursor::new(b"abc");
        assert_eq!(cursor.eat_stabs_identifier(), None);
    }

    #[test]
    fn dodgy_identifier_tolerates_template_colons() {
        let mut cursor = Cursor::new(b"DodgyTypeName<Namespace::A>:T");
        let name = cursor.eat_dodgy_stabs_identifier().unwrap();
        assert_eq!(name, "DodgyTypeName<Namespace::A>");
        assert_eq!(cursor.peek(), Some(b':'));
    }

    #[test]
    fn dodgy_identifier_truncation() {
        let mut cursor = Cursor::new(b"SomeVeryLongName");
        let error = cursor.eat_dodgy_stabs_identifier().unwrap_err();
        assert!(error.is_truncated());
    }

    #[test]
    fn expect_char_reports_context() {
        let mut cursor = Cursor::new(b"x");
        let error = cursor.expect_char(b';', "field list").unwrap_err();
        assert_eq!(error.expected, Some(';'));
        assert_eq!(error.got, Some(b'x'));
    }
}
