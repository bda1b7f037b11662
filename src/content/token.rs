//! Flat token view of a page content stream
//!
//! lopdf groups a content stream into operations (operands plus operator).
//! The watermark filter works on the flat sequence instead, where operands
//! precede the operator that consumes them, so this module converts between
//! the two shapes.

use indexmap::IndexMap;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

/// A single token of a content stream, in document order
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// An operator such as `q`, `gs` or `Tj`
    Operator(String),
    /// A name operand, without the leading slash
    Name(Vec<u8>),
    /// An integer operand
    Integer(i64),
    /// A real operand
    Number(f64),
    /// A string operand, keeping its literal/hex form
    String(Vec<u8>, StringFormat),
    /// An array operand (e.g. the argument of `TJ`)
    Array(Vec<Token>),
    /// A dictionary operand (e.g. marked-content properties of `BDC`)
    Dictionary(IndexMap<Vec<u8>, Token>),
    /// A boolean operand
    Boolean(bool),
    /// The null object
    Null,
    /// An indirect reference
    Reference(ObjectId),
    /// Inline image payload between `BI` and `EI`
    InlineImage {
        dict: IndexMap<Vec<u8>, Token>,
        data: Vec<u8>,
    },
}

impl Token {
    /// Create an operator token
    pub fn op(name: &str) -> Self {
        Token::Operator(name.to_string())
    }

    /// Create a name token
    pub fn name(name: &str) -> Self {
        Token::Name(name.as_bytes().to_vec())
    }

    /// Create a literal string token
    pub fn text(text: &str) -> Self {
        Token::String(text.as_bytes().to_vec(), StringFormat::Literal)
    }

    /// The operator name, if this token is an operator
    pub fn as_operator(&self) -> Option<&str> {
        match self {
            Token::Operator(op) => Some(op),
            _ => None,
        }
    }

    /// The name bytes, if this token is a name operand
    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            Token::Name(name) => Some(name),
            _ => None,
        }
    }
}

impl From<&Object> for Token {
    fn from(object: &Object) -> Self {
        match object {
            Object::Null => Token::Null,
            Object::Boolean(value) => Token::Boolean(*value),
            Object::Integer(value) => Token::Integer(*value),
            Object::Real(value) => Token::Number((*value).into()),
            Object::Name(name) => Token::Name(name.clone()),
            Object::String(bytes, format) => Token::String(bytes.clone(), *format),
            Object::Array(items) => Token::Array(items.iter().map(Token::from).collect()),
            Object::Dictionary(dict) => Token::Dictionary(dictionary_tokens(dict)),
            Object::Stream(stream) => Token::InlineImage {
                dict: dictionary_tokens(&stream.dict),
                data: stream.content.clone(),
            },
            Object::Reference(id) => Token::Reference(*id),
        }
    }
}

fn dictionary_tokens(dict: &Dictionary) -> IndexMap<Vec<u8>, Token> {
    dict.iter()
        .map(|(key, value)| (key.clone(), Token::from(value)))
        .collect()
}

fn token_dictionary(entries: IndexMap<Vec<u8>, Token>) -> Dictionary {
    let mut dict = Dictionary::new();
    for (key, value) in entries {
        if let Some(object) = value.into_operand() {
            dict.set(key, object);
        }
    }
    dict
}

impl Token {
    /// Convert an operand token back into a lopdf object.
    ///
    /// Returns `None` for operators, which are not objects.
    pub fn into_operand(self) -> Option<Object> {
        let object = match self {
            Token::Operator(_) => return None,
            Token::Null => Object::Null,
            Token::Boolean(value) => Object::Boolean(value),
            Token::Integer(value) => Object::Integer(value),
            Token::Number(value) => Object::Real(value as _),
            Token::Name(name) => Object::Name(name),
            Token::String(bytes, format) => Object::String(bytes, format),
            Token::Array(items) => {
                Object::Array(items.into_iter().filter_map(Token::into_operand).collect())
            }
            Token::Dictionary(entries) => Object::Dictionary(token_dictionary(entries)),
            Token::Reference(id) => Object::Reference(id),
            Token::InlineImage { dict, data } => Object::Stream(Stream {
                dict: token_dictionary(dict),
                content: data,
                allows_compression: false,
                start_position: None,
            }),
        };
        Some(object)
    }
}

/// Flatten decoded content into tokens: each operation's operands, then its operator
pub fn tokenize(content: &Content) -> Vec<Token> {
    let mut tokens = Vec::new();
    for operation in &content.operations {
        tokens.extend(operation.operands.iter().map(Token::from));
        tokens.push(Token::Operator(operation.operator.clone()));
    }
    tokens
}

/// Regroup a token sequence into operations.
///
/// Every operand seen since the previous operator belongs to the next
/// operator. Operands left over after the last operator have nothing to
/// attach to and are dropped.
pub fn assemble(tokens: Vec<Token>) -> Content {
    let mut operations = Vec::new();
    let mut operands = Vec::new();

    for token in tokens {
        match token {
            Token::Operator(operator) => {
                operations.push(Operation::new(&operator, std::mem::take(&mut operands)));
            }
            operand => {
                if let Some(object) = operand.into_operand() {
                    operands.push(object);
                }
            }
        }
    }

    if !operands.is_empty() {
        debug!(count = operands.len(), "dropping operands with no trailing operator");
    }

    Content { operations }
}

/// Serialize content into stream bytes.
///
/// lopdf keeps an inline image as a stream operand of `BI`, which
/// `Content::encode` would write as a `stream … endstream` object. Those
/// operations are written as `BI <entries> ID <data> EI` instead; everything
/// else goes through lopdf's encoder.
pub fn encode_content(content: &Content) -> lopdf::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    for (index, operation) in content.operations.iter().enumerate() {
        if index > 0 {
            buffer.push(b'\n');
        }
        match inline_image(operation) {
            Some(image) => write_inline_image(&mut buffer, image)?,
            None => {
                let single = Content {
                    operations: std::slice::from_ref(operation),
                };
                buffer.extend(single.encode()?);
            }
        }
    }
    Ok(buffer)
}

fn inline_image(operation: &Operation) -> Option<&Stream> {
    match operation.operands.as_slice() {
        [Object::Stream(stream)] if operation.operator == "BI" => Some(stream),
        _ => None,
    }
}

fn write_inline_image(buffer: &mut Vec<u8>, image: &Stream) -> lopdf::Result<()> {
    // `/Length` is added by the parser and is not an inline image key
    let entries: Vec<Object> = image
        .dict
        .iter()
        .filter(|(key, _)| key.as_slice() != b"Length")
        .flat_map(|(key, value)| [Object::Name(key.clone()), value.clone()])
        .collect();
    let header = Content {
        operations: vec![Operation::new("ID", entries)],
    };

    buffer.extend_from_slice(b"BI ");
    buffer.extend(header.encode()?);
    buffer.push(b' ');
    buffer.extend_from_slice(&image.content);
    buffer.extend_from_slice(b"\nEI");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_orders_operands_before_operator() {
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("gs", vec![Object::Name(b"Xi0".to_vec())]),
                Operation::new("Td", vec![Object::Integer(72), Object::Real(700.5)]),
                Operation::new("Q", vec![]),
            ],
        };

        let tokens = tokenize(&content);

        assert_eq!(
            tokens,
            vec![
                Token::op("q"),
                Token::name("Xi0"),
                Token::op("gs"),
                Token::Integer(72),
                Token::Number(700.5),
                Token::op("Td"),
                Token::op("Q"),
            ]
        );
    }

    #[test]
    fn test_assemble_attaches_operands_to_following_operator() {
        let tokens = vec![
            Token::op("BT"),
            Token::Array(vec![Token::text("Hel"), Token::Integer(-120), Token::text("lo")]),
            Token::op("TJ"),
            Token::op("ET"),
        ];

        let content = assemble(tokens);

        assert_eq!(content.operations.len(), 3);
        assert_eq!(content.operations[1].operator, "TJ");
        assert_eq!(content.operations[1].operands.len(), 1);
        assert!(matches!(content.operations[1].operands[0], Object::Array(ref items) if items.len() == 3));
        assert!(content.operations[2].operands.is_empty());
    }

    #[test]
    fn test_assemble_drops_dangling_operands() {
        let content = assemble(vec![Token::op("q"), Token::name("orphan")]);

        assert_eq!(content.operations.len(), 1);
        assert_eq!(content.operations[0].operator, "q");
    }

    #[test]
    fn test_decoded_stream_survives_token_bridge() {
        let source = b"q /Xi0 gs BT /F1 12 Tf (hello) Tj ET /Im1 Do Q";
        let content = Content::decode(source).expect("decode content");

        let rebuilt = assemble(tokenize(&content));

        assert_eq!(
            encode_content(&rebuilt).expect("encode rebuilt"),
            content.encode().expect("encode original")
        );
    }

    #[test]
    fn test_inline_image_survives_token_bridge() {
        let source = b"q BI /W 2 /H 1 /BPC 8 /CS /DeviceGray ID ab EI Q";
        let content = Content::decode(source).expect("decode content");
        let tokens = tokenize(&content);
        assert!(tokens
            .iter()
            .any(|t| matches!(t, Token::InlineImage { data, .. } if data.as_slice() == b"ab")));

        let encoded = encode_content(&assemble(tokens.clone())).expect("encode rebuilt");

        assert_eq!(
            encoded,
            b"q\nBI /W 2 /H 1 /BPC 8 /CS /DeviceGray ID ab\nEI\nQ".to_vec()
        );
        let reparsed = Content::decode(&encoded).expect("decode rebuilt");
        assert_eq!(tokenize(&reparsed), tokens);
    }

    #[test]
    fn test_encode_content_matches_lopdf_without_inline_images() {
        let content = Content::decode(b"q /GS0 gs BT (a) Tj ET Q").expect("decode content");

        assert_eq!(
            encode_content(&content).expect("encode"),
            content.encode().expect("encode with lopdf")
        );
    }
}
