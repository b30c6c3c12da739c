//! Loader for GORBITSA source
//!
//! Lexer for the instruction syntax
//!
//! A program is a run of tokens, each a single opcode byte followed by an optional
//! unsigned decimal operand, separated by spaces, tabs, and line breaks.

#[derive(Debug, Clone)]
pub struct Lexer<'l> {
    pub src: &'l [u8],
    pub pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub opcode: u8,
    pub operand: u8,
    pub pos: usize, // byte offset of the opcode
}

impl<'l> Lexer<'l> {
    pub fn new(src: &'l [u8]) -> Self {
        Lexer { src, pos: 0 }
    }

    /// Peek at the next byte without consuming it.
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    /// Peek, advance and return the peeked byte.
    fn advance(&mut self) -> Option<u8> {
        let peeked = self.peek();
        if peeked.is_some() {
            self.pos += 1;
        }
        peeked
    }

    fn is_separator(byte: u8) -> bool {
        matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
    }

    fn eat_whitespace(&mut self) {
        while self.peek().is_some_and(Self::is_separator) {
            self.advance();
        }
    }

    // Operands are bytes, so digits accumulate with wrap-around
    fn lex_operand(&mut self) -> u8 {
        let mut value = 0u8;
        while let Some(digit @ b'0'..=b'9') = self.peek() {
            value = value.wrapping_mul(10).wrapping_add(digit - b'0');
            self.advance();
        }
        value
    }

    pub fn next_token(&mut self) -> Option<Token> {
        self.eat_whitespace();

        let pos = self.pos;
        let opcode = self.advance()?;
        let operand = self.lex_operand();

        Some(Token {
            opcode,
            operand,
            pos,
        })
    }

    pub fn lex(&mut self) -> Vec<Token> {
        self.by_ref().collect()
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}
