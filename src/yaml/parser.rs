//! A comment-preserving parser for block-style YAML streams.
//!
//! The parser covers the subset of YAML that KRM resources are written in:
//! block mappings and sequences (including sequences that are not indented
//! under their key), plain, quoted and block scalars, and flow collections.
//! Anchors, aliases and complex keys are rejected.
//!
//! Comments are attached to nodes the same way throughout:
//! - comment lines before a mapping entry become the key's head comment,
//!   comment lines before a sequence item become the item's head comment;
//! - a trailing comment after a scalar value is the value's line comment,
//!   a trailing comment after `key:` that opens a nested block is the key's
//!   line comment;
//! - comment lines that close a block (followed by a dedent) become the foot
//!   comment of the block's last key or item.

use thiserror::Error;

use super::convert;
use super::node::{FoldedSource, Kind, Node, NodeRef, Style};
use super::scalar;

/// ParseError is returned for input that is not valid (supported) YAML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("yaml: line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

/// SequenceIndent is how block sequences nested under a mapping key are
/// indented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SequenceIndent {
    /// `key:\n- a`
    #[default]
    Compact,
    /// `key:\n  - a`
    Wide,
}

/// Stream is a parsed multi-document YAML input.
#[derive(Debug, Clone, Default)]
pub struct Stream {
    pub documents: Vec<NodeRef>,
    pub sequence_indent: SequenceIndent,
}

/// Parses a YAML stream into one node tree per document. Documents without
/// content are skipped.
pub fn parse(input: &str) -> Result<Stream, ParseError> {
    let mut parser = Parser::new(input)?;
    let documents = parser.parse_stream()?;
    Ok(Stream {
        documents,
        sequence_indent: parser.sequence_indent.unwrap_or_default(),
    })
}

#[derive(Debug, Clone)]
struct Line {
    indent: usize,
    text: String,
}

#[derive(Debug, Clone)]
struct Comment {
    indent: usize,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomp {
    Clip,
    Strip,
    Keep,
}

struct Parser<'a> {
    raw: Vec<&'a str>,
    lines: Vec<Line>,
    pos: usize,
    comments: Vec<Comment>,
    sequence_indent: Option<SequenceIndent>,
}

fn leading_spaces(s: &str) -> usize {
    s.len() - s.trim_start_matches(' ').len()
}

fn is_sequence_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ") || text.starts_with("-\t")
}

fn is_document_start(line: &Line) -> bool {
    line.indent == 0 && (line.text == "---" || line.text.starts_with("--- ") || line.text.starts_with("---\t"))
}

fn is_document_end(line: &Line) -> bool {
    line.indent == 0 && (line.text == "..." || line.text.starts_with("... "))
}

fn is_document_marker(line: &Line) -> bool {
    is_document_start(line) || is_document_end(line)
}

/// Returns the byte offset of the `:` separating a mapping key from its
/// value, if `text` starts with a mapping entry.
fn mapping_colon(text: &str) -> Option<usize> {
    if text.starts_with('[') || text.starts_with('{') || text.starts_with('#') {
        return None;
    }
    if text.starts_with('"') || text.starts_with('\'') {
        let len = scalar::quoted_len(text)?;
        let after = &text[len..];
        let trimmed = after.trim_start();
        let colon = len + (after.len() - trimmed.len());
        return is_value_indicator(text, colon).then_some(colon);
    }
    let bytes = text.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'#' if i > 0 && matches!(bytes[i - 1], b' ' | b'\t') => return None,
            b':' if is_value_indicator(text, i) => return Some(i),
            _ => {}
        }
    }
    None
}

fn is_value_indicator(text: &str, i: usize) -> bool {
    let bytes = text.as_bytes();
    bytes.get(i) == Some(&b':') && matches!(bytes.get(i + 1), None | Some(b' ') | Some(b'\t'))
}

/// Returns the byte offset where a trailing comment starts.
fn comment_start(text: &str, flow: bool) -> Option<usize> {
    let bytes = text.as_bytes();
    let flow = flow || matches!(bytes.first(), Some(b'[') | Some(b'{'));
    let mut i = 0;
    if matches!(bytes.first(), Some(b'"') | Some(b'\'')) {
        i = scalar::quoted_len(text)?;
    }
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if q == b'"' && b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == q {
                    if q == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
                        i += 2;
                        continue;
                    }
                    quote = None;
                }
            }
            None => {
                if b == b'#' && (i == 0 || matches!(bytes[i - 1], b' ' | b'\t')) {
                    return Some(i);
                }
                if flow && (b == b'"' || b == b'\'') {
                    let prev = text[..i].trim_end().as_bytes().last().copied();
                    if matches!(prev, None | Some(b'[') | Some(b'{') | Some(b',') | Some(b':')) {
                        quote = Some(b);
                    }
                }
            }
        }
        i += 1;
    }
    None
}

fn split_comment(text: &str, flow: bool) -> (String, String) {
    match comment_start(text, flow) {
        Some(i) => (text[..i].trim_end().to_string(), text[i..].to_string()),
        None => (text.trim_end().to_string(), String::new()),
    }
}

fn flow_depth(text: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in text.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if q == '"' && c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '[' | '{' => depth += 1,
                ']' | '}' => depth -= 1,
                _ => {}
            },
        }
    }
    depth
}

fn fold(lines: &[String]) -> String {
    let mut out = String::new();
    let mut prev_blank = true;
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            out.push('\n');
            prev_blank = true;
            continue;
        }
        if i > 0 && !prev_blank {
            let literal = line.starts_with(' ') || lines[i - 1].starts_with(' ');
            out.push(if literal { '\n' } else { ' ' });
        }
        out.push_str(line);
        prev_blank = false;
    }
    out
}

fn join_comments(first: String, second: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (_, true) => first,
        (true, false) => second.to_string(),
        (false, false) => format!("{}\n{}", first, second),
    }
}

fn mark_flow(node: &mut Node) {
    if !node.is_scalar() {
        node.style = Style::Flow;
        for child in &node.content {
            mark_flow(&mut child.borrow_mut());
        }
    }
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self, ParseError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let raw: Vec<&str> = input
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();
        let mut lines = Vec::with_capacity(raw.len());
        for (i, l) in raw.iter().enumerate() {
            let indent = leading_spaces(l);
            let text = l[indent..].trim_end();
            if text.starts_with('\t') && !text.trim_start().is_empty() && !text.trim_start().starts_with('#') {
                return Err(ParseError {
                    line: i + 1,
                    message: "found a tab character that violates indentation".to_string(),
                });
            }
            lines.push(Line {
                indent,
                text: text.to_string(),
            });
        }
        Ok(Parser {
            raw,
            lines,
            pos: 0,
            comments: Vec::new(),
            sequence_indent: None,
        })
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: (self.pos + 1).min(self.lines.len().max(1)),
            message: message.into(),
        }
    }

    /// Error on the line that was consumed last.
    fn err_consumed(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.pos.clamp(1, self.lines.len().max(1)),
            message: message.into(),
        }
    }

    fn current(&self) -> Option<&Line> {
        self.lines.get(self.pos)
    }

    fn skip_trivia(&mut self) {
        while let Some(line) = self.lines.get(self.pos) {
            if line.text.is_empty() {
                self.pos += 1;
            } else if line.text.starts_with('#') {
                self.comments.push(Comment {
                    indent: line.indent,
                    text: line.text.clone(),
                });
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn take_comments(&mut self) -> String {
        let text = self
            .comments
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.comments.clear();
        text
    }

    /// Takes the pending comments that are indented at least as deep as a
    /// block that just ended.
    fn take_foot_comments(&mut self, indent: usize) -> String {
        let n = self.comments.iter().take_while(|c| c.indent >= indent).count();
        self.comments
            .drain(..n)
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn note_sequence_indent(&mut self, style: SequenceIndent) {
        if self.sequence_indent.is_none() {
            self.sequence_indent = Some(style);
        }
    }

    fn parse_stream(&mut self) -> Result<Vec<NodeRef>, ParseError> {
        let mut documents = Vec::new();
        loop {
            self.skip_trivia();
            let Some(line) = self.current() else { break };
            if line.indent == 0 && line.text.starts_with('%') {
                self.pos += 1;
                continue;
            }
            if is_document_end(line) {
                self.pos += 1;
                self.comments.clear();
                continue;
            }
            if is_document_start(line) {
                let rest = line.text[3..].trim_start().to_string();
                if !rest.is_empty() {
                    if !rest.starts_with('#') {
                        return Err(self.err("content on the document start line is not supported"));
                    }
                    self.comments.push(Comment { indent: 0, text: rest });
                }
                self.pos += 1;
                continue;
            }
            let indent = line.indent;
            let root = self.parse_block(indent)?;
            self.skip_trivia();
            if let Some(line) = self.current() {
                if !is_document_marker(line) {
                    return Err(self.err("did not find expected <document start>"));
                }
            }
            let foot = self.take_comments();
            {
                let mut root_mut = root.borrow_mut();
                let existing = std::mem::take(&mut root_mut.foot_comment);
                root_mut.foot_comment = join_comments(existing, &foot);
            }
            documents.push(root);
        }
        Ok(documents)
    }

    /// Parses the block node starting at the current line, which is indented
    /// by `indent`.
    fn parse_block(&mut self, indent: usize) -> Result<NodeRef, ParseError> {
        let text = match self.current() {
            Some(line) => line.text.clone(),
            None => return Ok(Node::plain("").into_ref()),
        };
        if text == "?" || text.starts_with("? ") {
            return Err(self.err("complex mapping keys are not supported"));
        }
        if is_sequence_item(&text) {
            return self.parse_sequence(indent);
        }
        if mapping_colon(&text).is_some() {
            return self.parse_mapping(indent);
        }
        let head = self.take_comments();
        self.pos += 1;
        let (node, _) = self.parse_value(&text, indent.saturating_sub(1), false)?;
        {
            let mut node_mut = node.borrow_mut();
            let existing = std::mem::take(&mut node_mut.head_comment);
            node_mut.head_comment = join_comments(head, &existing);
        }
        Ok(node)
    }

    fn parse_mapping(&mut self, indent: usize) -> Result<NodeRef, ParseError> {
        let mut map = Node::mapping();
        loop {
            self.skip_trivia();
            let Some(line) = self.current() else { break };
            if is_document_marker(line) || line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(self.err("mapping values are not allowed in this context"));
            }
            let text = line.text.clone();
            if is_sequence_item(&text) {
                return Err(self.err("did not find expected key"));
            }
            if text == "?" || text.starts_with("? ") {
                return Err(self.err("complex mapping keys are not supported"));
            }
            let Some(colon) = mapping_colon(&text) else {
                return Err(self.err("could not find expected ':'"));
            };
            let mut key = self.parse_key(&text[..colon])?;
            if map.entry(&key.value).is_some() {
                return Err(self.err(format!("mapping key {:?} already defined", key.value)));
            }
            key.head_comment = self.take_comments();
            let rest = text[colon + 1..].trim_start().to_string();
            self.pos += 1;
            let (value, key_comment) = self.parse_value(&rest, indent, true)?;
            key.line_comment = key_comment;
            map.content.push(key.into_ref());
            map.content.push(value);
        }
        let foot = self.take_foot_comments(indent);
        if !foot.is_empty() && map.content.len() >= 2 {
            let last_key = &map.content[map.content.len() - 2];
            last_key.borrow_mut().foot_comment = foot;
        }
        Ok(map.into_ref())
    }

    fn parse_sequence(&mut self, indent: usize) -> Result<NodeRef, ParseError> {
        let mut seq = Node::sequence();
        loop {
            self.skip_trivia();
            let Some(line) = self.current() else { break };
            if is_document_marker(line) || line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(self.err("did not find expected '-' indicator"));
            }
            if !is_sequence_item(&line.text) {
                break;
            }
            let text = line.text.clone();
            let head = self.take_comments();
            let after_dash = &text[1..];
            let rest = after_dash.trim_start();
            let offset = 1 + (after_dash.len() - rest.len());
            let nested_block = !rest.is_empty()
                && !rest.starts_with('#')
                && (is_sequence_item(rest) || mapping_colon(rest).is_some());
            let item = if nested_block {
                let line = &mut self.lines[self.pos];
                line.indent = indent + offset;
                line.text = rest.to_string();
                self.parse_block(indent + offset)?
            } else {
                self.pos += 1;
                let (node, extra) = self.parse_value(rest, indent, false)?;
                if !extra.is_empty() {
                    node.borrow_mut().line_comment = extra;
                }
                node
            };
            {
                let mut item_mut = item.borrow_mut();
                let existing = std::mem::take(&mut item_mut.head_comment);
                item_mut.head_comment = join_comments(head, &existing);
            }
            seq.content.push(item);
        }
        let foot = self.take_foot_comments(indent);
        if !foot.is_empty() {
            if let Some(last) = seq.content.last() {
                last.borrow_mut().foot_comment = foot;
            }
        }
        Ok(seq.into_ref())
    }

    fn parse_key(&self, text: &str) -> Result<Node, ParseError> {
        let text = text.trim_end();
        match text.chars().next() {
            Some('"') | Some('\'') => {
                let value = scalar::unquote(text).map_err(|e| self.err(e))?;
                let style = if text.starts_with('"') {
                    Style::DoubleQuoted
                } else {
                    Style::SingleQuoted
                };
                Ok(Node {
                    kind: Kind::Scalar,
                    style,
                    value,
                    ..Default::default()
                })
            }
            Some('&') | Some('*') => Err(self.err("anchors and aliases are not supported")),
            _ => Ok(Node::plain(text)),
        }
    }

    /// Parses the value following `key:` or `-` on a line that has already
    /// been consumed. Returns the value and the comment that belongs to the
    /// line holding the indicator.
    fn parse_value(&mut self, rest: &str, indent: usize, in_mapping: bool) -> Result<(NodeRef, String), ParseError> {
        let (text, comment) = split_comment(rest, false);
        if text.is_empty() {
            self.skip_trivia();
            let node = match self.current() {
                Some(line) if !is_document_marker(line) && line.indent > indent => {
                    let child = line.indent;
                    let node = self.parse_block(child)?;
                    if in_mapping && node.borrow().is_sequence() {
                        self.note_sequence_indent(SequenceIndent::Wide);
                    }
                    node
                }
                Some(line)
                    if in_mapping
                        && !is_document_marker(line)
                        && line.indent == indent
                        && is_sequence_item(&line.text) =>
                {
                    self.note_sequence_indent(SequenceIndent::Compact);
                    self.parse_sequence(indent)?
                }
                _ => Node::plain("").into_ref(),
            };
            return Ok((node, comment));
        }

        let mut node = match text.chars().next() {
            Some('|') | Some('>') => self.parse_block_scalar(&text, indent)?,
            Some('[') | Some('{') => self.parse_flow(&text)?,
            Some('&') | Some('*') => return Err(self.err("anchors and aliases are not supported")),
            Some('!') => {
                let (tag, remainder) = match text.find([' ', '\t']) {
                    Some(i) => (text[..i].to_string(), text[i..].trim_start().to_string()),
                    None => (text.clone(), String::new()),
                };
                let rejoined = if comment.is_empty() {
                    remainder
                } else {
                    format!("{} {}", remainder, comment)
                };
                let (node, key_comment) = self.parse_value(&rejoined, indent, in_mapping)?;
                node.borrow_mut().tag = Some(tag);
                return Ok((node, key_comment));
            }
            Some('"') | Some('\'') => {
                let (node, trailing) = self.parse_quoted(&text)?;
                if !trailing.is_empty() {
                    let mut node = node;
                    node.line_comment = trailing;
                    return Ok((node.into_ref(), String::new()));
                }
                node
            }
            _ => {
                let (node, trailing) = self.parse_plain(&text, indent, comment.is_empty());
                if !trailing.is_empty() {
                    let mut node = node;
                    node.line_comment = trailing;
                    return Ok((node.into_ref(), String::new()));
                }
                node
            }
        };
        node.line_comment = comment;
        Ok((node.into_ref(), String::new()))
    }

    fn parse_quoted(&mut self, text: &str) -> Result<(Node, String), ParseError> {
        let mut buf = text.to_string();
        let mut trailing = String::new();
        match scalar::quoted_len(&buf) {
            Some(len) if len == buf.len() => {}
            Some(_) => return Err(self.err_consumed("did not find expected key")),
            None => loop {
                let Some(raw) = self.raw.get(self.pos) else {
                    return Err(self.err("found unexpected end of stream"));
                };
                buf.push('\n');
                buf.push_str(raw.trim());
                self.pos += 1;
                if let Some(len) = scalar::quoted_len(&buf) {
                    let tail = buf[len..].trim().to_string();
                    if tail.starts_with('#') {
                        trailing = tail;
                    } else if !tail.is_empty() {
                        return Err(self.err_consumed("did not find expected key"));
                    }
                    buf.truncate(len);
                    break;
                }
            },
        }
        let value = scalar::unquote(&buf).map_err(|e| self.err_consumed(e))?;
        let style = if buf.starts_with('"') {
            Style::DoubleQuoted
        } else {
            Style::SingleQuoted
        };
        let node = Node {
            kind: Kind::Scalar,
            style,
            value,
            ..Default::default()
        };
        Ok((node, trailing))
    }

    /// Parses a plain scalar, joining more-indented continuation lines.
    fn parse_plain(&mut self, text: &str, indent: usize, may_continue: bool) -> (Node, String) {
        let mut value = text.to_string();
        let mut trailing = String::new();
        if may_continue {
            while let Some(line) = self.lines.get(self.pos) {
                if line.text.is_empty()
                    || line.text.starts_with('#')
                    || line.indent <= indent
                    || is_document_marker(line)
                    || mapping_colon(&line.text).is_some()
                {
                    break;
                }
                let (t, c) = split_comment(&line.text, false);
                value.push(' ');
                value.push_str(&t);
                self.pos += 1;
                if !c.is_empty() {
                    trailing = c;
                    break;
                }
            }
        }
        (Node::plain(value), trailing)
    }

    fn parse_flow(&mut self, text: &str) -> Result<Node, ParseError> {
        let mut buf = text.to_string();
        let mut trailing = String::new();
        while flow_depth(&buf) > 0 {
            let Some(line) = self.lines.get(self.pos) else {
                return Err(self.err("did not find expected ',' or ']'"));
            };
            let (t, c) = split_comment(&line.text, true);
            buf.push(' ');
            buf.push_str(&t);
            self.pos += 1;
            if !c.is_empty() {
                trailing = c;
            }
        }
        let value: serde_yaml::Value = serde_yaml::from_str(&buf)
            .map_err(|e| self.err(format!("invalid flow collection: {}", e)))?;
        let mut node = convert::value_to_node(&value);
        mark_flow(&mut node);
        node.line_comment = trailing;
        Ok(node)
    }

    fn parse_block_scalar(&mut self, header: &str, indent: usize) -> Result<Node, ParseError> {
        let folded = header.starts_with('>');
        let mut chomp = Chomp::Clip;
        let mut explicit = None;
        for c in header[1..].chars() {
            match c {
                '-' => chomp = Chomp::Strip,
                '+' => chomp = Chomp::Keep,
                '1'..='9' => explicit = c.to_digit(10).map(|d| d as usize),
                _ => return Err(self.err(format!("invalid block scalar header {:?}", header))),
            }
        }
        let content_indent = match explicit {
            Some(n) => indent + n,
            None => {
                let first = self.raw[self.pos.min(self.raw.len())..]
                    .iter()
                    .find(|l| !l.trim().is_empty())
                    .map(|l| leading_spaces(l));
                match first {
                    Some(ind) if ind > indent => ind,
                    _ => indent + 1,
                }
            }
        };

        let mut lines: Vec<String> = Vec::new();
        while let Some(raw) = self.raw.get(self.pos) {
            if raw.trim().is_empty() {
                lines.push(String::new());
                self.pos += 1;
                continue;
            }
            if leading_spaces(raw) < content_indent {
                break;
            }
            lines.push(raw[content_indent..].trim_end_matches('\r').to_string());
            self.pos += 1;
        }
        let trailing = lines.iter().rev().take_while(|l| l.is_empty()).count();
        let body = &lines[..lines.len() - trailing];
        let kept = if chomp == Chomp::Keep { &lines[..] } else { body };

        let mut value = if folded { fold(body) } else { body.join("\n") };
        match chomp {
            Chomp::Strip => {}
            Chomp::Clip => {
                if !body.is_empty() {
                    value.push('\n');
                }
            }
            Chomp::Keep => {
                if !body.is_empty() {
                    value.push('\n');
                }
                value.push_str(&"\n".repeat(trailing));
            }
        }
        let source = (folded && explicit.is_none()).then(|| FoldedSource {
            value: value.clone(),
            header: header.to_string(),
            lines: kept.to_vec(),
        });
        Ok(Node {
            kind: Kind::Scalar,
            style: if folded { Style::Folded } else { Style::Literal },
            value,
            folded: source,
            ..Default::default()
        })
    }
}
