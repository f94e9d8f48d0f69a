//! Parser for the netlist DSL.

use std::collections::HashMap;

use super::ast::*;
use super::lexer::{parse_value, Lexer, Token, TokenKind};
use crate::circuit::Position;
use crate::error::{CckError, Result};

/// Parser for netlist DSL.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parse the entire netlist.
    pub fn parse(&mut self) -> Result<CircuitAst> {
        let mut ast = CircuitAst::new();

        while self.current.kind != TokenKind::Eof {
            // Skip empty lines
            if self.current.kind == TokenKind::Newline {
                self.advance()?;
                continue;
            }

            match self.current.kind {
                TokenKind::Directive => self.parse_directive(&mut ast)?,
                TokenKind::Identifier => {
                    let element = self.parse_element()?;
                    ast.elements.push(element);
                }
                _ => {
                    return Err(CckError::parse(
                        self.current.line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }

            // Anything left on the line is an error
            match self.current.kind {
                TokenKind::Newline => self.advance()?,
                TokenKind::Eof => {}
                _ => {
                    return Err(CckError::parse(
                        self.current.line,
                        format!("unexpected trailing token: {:?}", self.current.text),
                    ));
                }
            }
        }

        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn at_line_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(CckError::parse(
                self.current.line,
                format!("expected {:?}, got {:?}", kind, self.current.kind),
            ))
        }
    }

    fn expect_number(&mut self) -> Result<f64> {
        let tok = self.expect(TokenKind::Number)?;
        parse_value(&tok.text)
            .ok_or_else(|| CckError::parse(tok.line, format!("invalid number: {}", tok.text)))
    }

    /// A vertex name: any identifier or bare number. `GND` is an alias for `0`.
    fn vertex_name(&mut self) -> Option<String> {
        match self.current.kind {
            TokenKind::Identifier | TokenKind::Number => {
                let text = self.current.text.clone();
                if text.eq_ignore_ascii_case("gnd") {
                    Some("0".to_string())
                } else {
                    Some(text)
                }
            }
            _ => None,
        }
    }

    /// Read `key=value` pairs and bare flags until end of line.
    fn parse_settings(&mut self) -> Result<(HashMap<String, f64>, Vec<String>)> {
        let mut params = HashMap::new();
        let mut flags = Vec::new();

        while !self.at_line_end() {
            let key = self.expect(TokenKind::Identifier)?;
            if self.current.kind == TokenKind::Equals {
                self.advance()?;
                let value = self.expect_number()?;
                params.insert(key.text.to_lowercase(), value);
            } else {
                flags.push(key.text.to_lowercase());
            }
        }

        Ok((params, flags))
    }

    fn parse_directive(&mut self, ast: &mut CircuitAst) -> Result<()> {
        let directive = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        match directive.to_lowercase().as_str() {
            ".vertex" => {
                let name = self
                    .vertex_name()
                    .ok_or_else(|| CckError::parse(line, "expected vertex name"))?;
                self.advance()?;

                let position = if self.at_line_end() {
                    None
                } else {
                    let x = self.expect_number()?;
                    let y = self.expect_number()?;
                    Some(Position::new(x, y))
                };

                ast.vertices.push(VertexDecl {
                    name,
                    position,
                    line,
                });
            }
            ".options" => {
                let (params, flags) = self.parse_settings()?;
                for (key, value) in params {
                    match key.as_str() {
                        "dt" => ast.options.dt = Some(value),
                        "steps" => ast.options.steps = Some(Self::count(line, &key, value)?),
                        "maxiter" => {
                            ast.options.max_iterations = Some(Self::count(line, &key, value)?)
                        }
                        "tol" => ast.options.tolerance = Some(value),
                        _ => return Err(CckError::parse(line, format!("unknown option: {}", key))),
                    }
                }
                for flag in flags {
                    match flag.as_str() {
                        "trap" => ast.options.trapezoidal = true,
                        "be" => ast.options.trapezoidal = false,
                        _ => return Err(CckError::parse(line, format!("unknown option: {}", flag))),
                    }
                }
            }
            ".end" => {
                // Ignore everything after .end
                while self.current.kind != TokenKind::Eof {
                    self.advance()?;
                }
            }
            _ => {
                return Err(CckError::parse(
                    line,
                    format!("unknown directive: {}", directive),
                ));
            }
        }

        Ok(())
    }

    fn count(line: usize, key: &str, value: f64) -> Result<usize> {
        if value >= 0.0 && value.fract() == 0.0 {
            Ok(value as usize)
        } else {
            Err(CckError::parse(
                line,
                format!("{} must be a non-negative integer, got {}", key, value),
            ))
        }
    }

    fn parse_element(&mut self) -> Result<ElementDef> {
        let name = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        let element_type =
            ElementType::from_name(&name).ok_or_else(|| CckError::UnknownElementType {
                element_type: name.clone(),
                line,
            })?;

        let mut vertices = Vec::with_capacity(2);
        while vertices.len() < 2 {
            match self.vertex_name() {
                Some(v) => {
                    vertices.push(v);
                    self.advance()?;
                }
                None => {
                    return Err(CckError::invalid_element(
                        &name,
                        line,
                        format!("expected 2 vertices, got {}", vertices.len()),
                    ));
                }
            }
        }

        let value = if self.current.kind == TokenKind::Number {
            Some(self.expect_number()?)
        } else {
            None
        };

        let (params, flags) = self.parse_settings().map_err(|e| match e {
            CckError::ParseError { message, .. } => CckError::invalid_element(&name, line, message),
            other => other,
        })?;

        Ok(ElementDef {
            element_type,
            name,
            vertices,
            value,
            params,
            flags,
            line,
        })
    }
}
