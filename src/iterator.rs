/*
  Copyright 2017 Takashi Ogura

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
//! Iterators to iterate descendants and ancestors
use crate::node::*;

#[derive(Debug)]
/// Iterator for parents
pub struct Ancestors {
    parent: Option<Node>,
}

impl Ancestors {
    pub fn new(parent: Option<Node>) -> Self {
        Self { parent }
    }
}

impl Iterator for Ancestors {
    type Item = Node;
    fn next(&mut self) -> Option<Node> {
        let next = self.parent.take()?;
        self.parent = next.parent();
        Some(next)
    }
}

#[derive(Debug)]
/// Iterator for children
///
/// Depth first, a parent always comes before its children and siblings keep
/// the order in which they were added.
pub struct Descendants {
    stack: Vec<Node>,
}

impl Descendants {
    pub fn new(stack: Vec<Node>) -> Self {
        Self { stack }
    }
}

impl Iterator for Descendants {
    type Item = Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev().cloned());
        Some(node)
    }
}
