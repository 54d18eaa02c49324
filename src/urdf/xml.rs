/*
  Licensed under the Apache License, Version 2.0 (the "License");
  you may not use this file except in compliance with the License.
  You may obtain a copy of the License at

      http://www.apache.org/licenses/LICENSE-2.0

  Unless required by applicable law or agreed to in writing, software
  distributed under the License is distributed on an "AS IS" BASIS,
  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
  See the License for the specific language governing permissions and
  limitations under the License.
*/
//! Small element tree read with `quick-xml`
use crate::errors::*;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, Default)]
pub(crate) struct XmlElement {
    pub name: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn from_start(e: &BytesStart) -> Result<Self> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr =
                attr.map_err(|e| Error::malformed(format!("bad attribute in <{name}>: {e}")))?;
            let value = attr
                .unescape_value()
                .map_err(|e| Error::malformed(format!("bad attribute value in <{name}>: {e}")))?;
            attributes.push((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                value.into_owned(),
            ));
        }
        Ok(XmlElement {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First direct child with the name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First element with the name in document order, including self
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        let mut stack = vec![self];
        while let Some(element) = stack.pop() {
            if element.name == name {
                return Some(element);
            }
            stack.extend(element.children.iter().rev());
        }
        None
    }

    /// All elements with the name in document order, including self
    pub fn find_all<'a>(&'a self, name: &'a str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        let mut stack = vec![self];
        while let Some(element) = stack.pop() {
            if element.name == name {
                found.push(element);
            }
            stack.extend(element.children.iter().rev());
        }
        found
    }
}

/// Read the whole text into a tree under an unnamed document element
pub(crate) fn parse_document(text: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut stack = vec![XmlElement::default()];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => stack.push(XmlElement::from_start(e)?),
            Ok(Event::Empty(ref e)) => {
                let element = XmlElement::from_start(e)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::malformed("unbalanced end tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Err(Error::malformed("unbalanced end tag")),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::malformed(format!("xml parse error: {e}"))),
        }
        buf.clear();
    }

    if stack.len() != 1 {
        return Err(Error::malformed("unexpected end of document"));
    }
    stack
        .pop()
        .ok_or_else(|| Error::malformed("unexpected end of document"))
}
