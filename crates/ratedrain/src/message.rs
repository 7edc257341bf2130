//! Queue message type.

use crate::error::MessageError;
use std::collections::BTreeMap;
use std::fmt;

/// A queued message: an opaque byte body plus optional string attributes.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Message {
    body: Vec<u8>,
    attributes: BTreeMap<String, String>,
}

impl Message {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute (builder style).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decodes the body as UTF-8.
    pub fn body_str(&self) -> Result<&str, MessageError> {
        Ok(std::str::from_utf8(&self.body)?)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("body", &String::from_utf8_lossy(&self.body))
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl From<&str> for Message {
    fn from(body: &str) -> Self {
        Self::new(body)
    }
}

impl From<String> for Message {
    fn from(body: String) -> Self {
        Self::new(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_decoding() {
        let message = Message::from("m0").with_attribute("source", "seed");
        assert_eq!(message.body_str().unwrap(), "m0");
        assert_eq!(message.attribute("source"), Some("seed"));
        assert_eq!(message.len(), 2);

        let invalid = Message::new(vec![0xff, 0xfe]);
        assert!(matches!(invalid.body_str(), Err(MessageError::InvalidBody(_))));
    }
}
