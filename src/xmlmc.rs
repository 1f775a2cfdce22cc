//! XMLMC wire format: request encoding and response decoding.
//!
//! Every API call is a `methodCall` document posted to the instance:
//!
//! ```text
//! <methodCall service="library" method="documentAdd">
//!   <params>
//!     <title>Leave Policy</title>
//!     <serverFile><fileName>leave.pdf</fileName>...</serverFile>
//!   </params>
//! </methodCall>
//! ```
//!
//! and every reply is a `methodCallResult` whose `status` attribute is `ok`
//! or `fail`. Failed calls carry `<state><code/><error/></state>`; successful
//! ones carry their output under `<params>`.
//!
//! Parameters form an ordered tree ([`Params`]) because the service cares
//! about element order and allows repeated names.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Error returned by the remote API layer.
#[derive(Debug)]
pub enum ApiError {
    /// Local I/O failure while preparing a request (e.g. unreadable file).
    Io(String),
    /// The HTTP request itself failed (connect, timeout, TLS).
    Http(String),
    /// The server answered with a non-success HTTP status.
    Status(String),
    /// A response body could not be decoded.
    Decode(String),
    /// A request body could not be encoded.
    Encode(String),
    /// The service processed the call and reported a failure.
    Method { method: String, message: String },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Io(e) => write!(f, "I/O error: {}", e),
            ApiError::Http(e) => write!(f, "HTTP request failed: {}", e),
            ApiError::Status(s) => write!(f, "unexpected HTTP status: {}", s),
            ApiError::Decode(e) => write!(f, "invalid response: {}", e),
            ApiError::Encode(e) => write!(f, "could not encode request: {}", e),
            ApiError::Method { method, message } => write!(f, "{} failed: {}", method, message),
        }
    }
}

impl std::error::Error for ApiError {}

/// An API method, addressed by service and method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Method {
    pub service: &'static str,
    pub name: &'static str,
}

impl Method {
    pub const fn new(service: &'static str, name: &'static str) -> Self {
        Self { service, name }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.service, self.name)
    }
}

/// A single parameter value: plain text or a nested element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Element(Params),
}

/// Ordered parameter tree for a call or a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.entries
            .push((name.to_string(), Value::Text(value.into())));
        self
    }

    /// Add a nested element, filling it through `build`.
    pub fn element(&mut self, name: &str, build: impl FnOnce(&mut Params)) -> &mut Self {
        let mut inner = Params::new();
        build(&mut inner);
        self.entries.push((name.to_string(), Value::Element(inner)));
        self
    }

    /// First text value named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find_map(|(k, v)| match v {
            Value::Text(t) if k == name => Some(t.as_str()),
            _ => None,
        })
    }

    /// All nested elements named `name`, in document order.
    pub fn elements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Params> + 'a {
        self.entries.iter().filter_map(move |(k, v)| match v {
            Value::Element(p) if k == name => Some(p),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compact single-line XML of the parameters, used for log lines.
    pub fn render(&self) -> String {
        let mut writer = Writer::new(Vec::new());
        match write_params(&mut writer, self) {
            Ok(()) => String::from_utf8_lossy(&writer.into_inner()).into_owned(),
            Err(e) => format!("<unrenderable: {}>", e),
        }
    }
}

/// Encode a full `methodCall` document.
pub fn encode_call(method: &Method, params: &Params) -> Result<String, ApiError> {
    let mut writer = Writer::new(Vec::new());
    let mut call = BytesStart::new("methodCall");
    call.push_attribute(("service", method.service));
    call.push_attribute(("method", method.name));
    emit(&mut writer, Event::Start(call))?;
    emit(&mut writer, Event::Start(BytesStart::new("params")))?;
    write_params(&mut writer, params)?;
    emit(&mut writer, Event::End(BytesEnd::new("params")))?;
    emit(&mut writer, Event::End(BytesEnd::new("methodCall")))?;
    String::from_utf8(writer.into_inner()).map_err(|e| ApiError::Encode(e.to_string()))
}

fn write_params(writer: &mut Writer<Vec<u8>>, params: &Params) -> Result<(), ApiError> {
    for (name, value) in &params.entries {
        emit(writer, Event::Start(BytesStart::new(name.as_str())))?;
        match value {
            Value::Text(text) => emit(writer, Event::Text(BytesText::new(text)))?,
            Value::Element(inner) => write_params(writer, inner)?,
        }
        emit(writer, Event::End(BytesEnd::new(name.as_str())))?;
    }
    Ok(())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ApiError> {
    writer
        .write_event(event)
        .map_err(|e| ApiError::Encode(e.to_string()))
}

/// Decoded `methodCallResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub ok: bool,
    pub code: Option<String>,
    pub error: Option<String>,
    pub params: Params,
}

impl Response {
    /// Successful reply with no output, as produced by a simulated call.
    pub fn synthetic_ok() -> Self {
        Self {
            ok: true,
            code: None,
            error: None,
            params: Params::new(),
        }
    }

    pub fn parse(xml: &str) -> Result<Self, ApiError> {
        let root = parse_tree(xml)?;
        if root.name != "methodCallResult" {
            return Err(ApiError::Decode(format!(
                "expected <methodCallResult>, found <{}>",
                root.name
            )));
        }

        let ok = root
            .attrs
            .iter()
            .any(|(k, v)| k == "status" && v == "ok");

        let state = root.child("state");
        let code = state.and_then(|s| s.child_text("code"));
        let error = state.and_then(|s| s.child_text("error"));
        let params = root.child("params").map(Node::to_params).unwrap_or_default();

        Ok(Self {
            ok,
            code,
            error,
            params,
        })
    }

    /// Turn a `fail` status into an [`ApiError::Method`].
    pub fn into_result(self, method: &Method) -> Result<Self, ApiError> {
        if self.ok {
            return Ok(self);
        }
        let message = match (&self.error, &self.code) {
            (Some(e), _) if !e.is_empty() => e.clone(),
            (_, Some(c)) => format!("status code {}", c),
            _ => "no error detail returned".to_string(),
        };
        Err(ApiError::Method {
            method: method.to_string(),
            message,
        })
    }
}

/// Strip line breaks and tabs so a response fits on one log line.
pub fn flatten(xml: &str) -> String {
    xml.chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '\t'))
        .collect()
}

// ============ Generic XML tree ============

#[derive(Debug, Default)]
struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(|c| c.text.clone())
    }

    fn to_params(&self) -> Params {
        let mut params = Params::new();
        for child in &self.children {
            let value = if child.children.is_empty() {
                Value::Text(child.text.clone())
            } else {
                Value::Element(child.to_params())
            };
            params.entries.push((child.name.clone(), value));
        }
        params
    }
}

fn parse_tree(xml: &str) -> Result<Node, ApiError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(open_node(&e)?),
            Ok(Event::Empty(e)) => {
                let node = open_node(&e)?;
                attach(&mut stack, &mut root, node);
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| ApiError::Decode(e.to_string()))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ApiError::Decode(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    root.ok_or_else(|| ApiError::Decode("empty response body".to_string()))
}

fn open_node(start: &BytesStart<'_>) -> Result<Node, ApiError> {
    let mut node = Node {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        ..Default::default()
    };
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ApiError::Decode(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        node.attrs.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(node)
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_none() {
        *root = Some(node);
    }
}
