/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::decode::{ScopedDecoder, XmlDecodeError};
use crate::unescape::unescape;
use crate::{DeserializeXml, XmlToken};
use xmlparser::{ElementEnd, Token};

/// Untyped XML element
///
/// Used as the output of operations invoked by name, where no typed output shape exists.
/// `text` is the concatenation of the element's direct text children; whitespace-only runs
/// between elements are dropped. Attributes are not retained.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub text: String,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Node {
            name: name.into(),
            ..Default::default()
        }
    }

    /// First child with the given local name
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All children with the given local name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Follows a path of local names, e.g. `["regionInfo", "item"]`
    pub fn find(&self, path: &[&str]) -> Option<&Node> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }
}

impl DeserializeXml for Node {
    fn deserialize_xml(decoder: &mut ScopedDecoder<'_, '_>) -> Result<Self, XmlDecodeError> {
        let mut root = Node::new(decoder.start_el().local());
        let mut open: Vec<Node> = vec![];
        for tok in decoder {
            let (XmlToken(tok), _depth) = tok?;
            match tok {
                Token::ElementStart { local, .. } => open.push(Node::new(local.as_str())),
                Token::ElementEnd {
                    end: ElementEnd::Close(..) | ElementEnd::Empty,
                    ..
                } => {
                    let done = open
                        .pop()
                        .ok_or_else(|| XmlDecodeError::custom("unbalanced close tag"))?;
                    open.last_mut().unwrap_or(&mut root).children.push(done);
                }
                Token::Text { text } => {
                    let text = text.as_str();
                    if !text.trim().is_empty() {
                        let target = open.last_mut().unwrap_or(&mut root);
                        target.text.push_str(&unescape(text)?);
                    }
                }
                Token::Cdata { text, .. } => {
                    open.last_mut()
                        .unwrap_or(&mut root)
                        .text
                        .push_str(text.as_str());
                }
                _ => {}
            }
        }
        if !open.is_empty() {
            return Err(XmlDecodeError::custom("unexpected end of document"));
        }
        Ok(root)
    }
}

#[cfg(test)]
mod test {
    use super::Node;
    use crate::{DeserializeXml, Document};
    use pretty_assertions::assert_eq;

    fn parse(xml: &str) -> Node {
        let mut doc = Document::new(xml);
        let mut root = doc.root_element().expect("valid document");
        Node::deserialize_xml(&mut root).expect("valid node")
    }

    #[test]
    fn reads_nested_elements() {
        let node = parse(
            r#"<DescribeRegionsResponse xmlns="http://ec2.amazonaws.com/doc/2016-11-15/">
                <requestId>59dbff89-35bd-4eac-99ed-be587EXAMPLE</requestId>
                <regionInfo>
                    <item>
                        <regionName>us-east-1</regionName>
                        <regionEndpoint>ec2.us-east-1.amazonaws.com</regionEndpoint>
                    </item>
                    <item>
                        <regionName>eu-west-1</regionName>
                        <regionEndpoint/>
                    </item>
                </regionInfo>
            </DescribeRegionsResponse>"#,
        );
        assert_eq!(node.name, "DescribeRegionsResponse");
        assert_eq!(node.text, "");
        assert_eq!(
            node.child("requestId").map(|n| n.text.as_str()),
            Some("59dbff89-35bd-4eac-99ed-be587EXAMPLE")
        );
        let names: Vec<_> = node
            .child("regionInfo")
            .expect("regionInfo")
            .children_named("item")
            .filter_map(|item| item.child("regionName"))
            .map(|n| n.text.as_str())
            .collect();
        assert_eq!(names, vec!["us-east-1", "eu-west-1"]);
        let second_endpoint = &node.find(&["regionInfo"]).unwrap().children[1].children[1];
        assert_eq!(second_endpoint, &Node::new("regionEndpoint"));
    }

    #[test]
    fn unescapes_text() {
        let node = parse("<A><B>x &lt; y</B><C><![CDATA[<raw>]]></C></A>");
        assert_eq!(node.find(&["B"]).unwrap().text, "x < y");
        assert_eq!(node.find(&["C"]).unwrap().text, "<raw>");
    }

    #[test]
    fn self_closing_root() {
        assert_eq!(parse("<Empty/>"), Node::new("Empty"));
    }
}
