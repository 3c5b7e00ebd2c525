//! In-memory session tree
//!
//! A session-stack file is a flat line sequence; directories are declared by
//! full path, not nesting. The parser threads a `current directory` context
//! through the line loop: each marker switches the context, and every
//! session record attaches to whatever context is active. The resulting tree
//! is rebuilt on every command, never cached.

use crate::error::StackError;
use crate::stack::record::{Line, SessionRecord};

/// A child of a directory node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Directory(DirNode),
    Session(SessionRecord),
}

/// A directory with insertion-ordered children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirNode {
    pub name: String,
    pub children: Vec<Node>,
}

impl DirNode {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Find an immediate child directory by name
    pub fn child_dir(&self, name: &str) -> Option<&DirNode> {
        self.children.iter().find_map(|c| match c {
            Node::Directory(d) if d.name == name => Some(d),
            _ => None,
        })
    }

    /// Find an immediate child session by exact name
    pub fn session(&self, name: &str) -> Option<&SessionRecord> {
        self.children.iter().find_map(|c| match c {
            Node::Session(s) if s.name == name => Some(s),
            _ => None,
        })
    }

    /// Walk a directory path below this node
    pub fn dir_at<S: AsRef<str>>(&self, path: &[S]) -> Option<&DirNode> {
        let mut node = self;
        for segment in path {
            node = node.child_dir(segment.as_ref())?;
        }
        Some(node)
    }

    /// Get or create an immediate child directory, preserving insertion order
    fn ensure_dir(&mut self, name: &str) -> &mut DirNode {
        let idx = self
            .children
            .iter()
            .position(|c| matches!(c, Node::Directory(d) if d.name == name));

        let idx = match idx {
            Some(i) => i,
            None => {
                self.children.push(Node::Directory(DirNode::new(name)));
                self.children.len() - 1
            }
        };

        match &mut self.children[idx] {
            Node::Directory(d) => d,
            Node::Session(_) => unreachable!("index points at a directory child"),
        }
    }

    /// Get or create the full directory chain below this node.
    ///
    /// Markers may arrive in any order; a child declared before its parent
    /// creates the missing ancestors on the way.
    fn ensure_chain(&mut self, path: &[String]) -> &mut DirNode {
        let mut node = self;
        for segment in path {
            node = node.ensure_dir(segment);
        }
        node
    }

    /// Attach a session. A sibling session with the same name is replaced;
    /// the export format allows re-exported duplicates and the last record
    /// wins.
    fn insert_session(&mut self, record: SessionRecord) {
        let existing = self
            .children
            .iter_mut()
            .find(|c| matches!(c, Node::Session(s) if s.name == record.name));

        match existing {
            Some(slot) => *slot = Node::Session(record),
            None => self.children.push(Node::Session(record)),
        }
    }
}

/// One parsed session-stack file
#[derive(Debug, Clone)]
pub struct SessionStack {
    /// Registry name the stack was imported under
    pub name: String,
    root: DirNode,
}

impl SessionStack {
    /// Parse the text of a session-stack export into a tree
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, StackError> {
        let mut root = DirNode::new("");
        // Directory context for subsequent session records; markers replace it
        let mut cursor: Vec<String> = Vec::new();

        for raw in text.lines() {
            match Line::classify(raw)? {
                Line::Directory(path) => {
                    root.ensure_chain(&path);
                    cursor = path;
                }
                Line::Session(record) => {
                    root.ensure_chain(&cursor).insert_session(record);
                }
                Line::Unrecognized => {}
            }
        }

        Ok(Self {
            name: name.into(),
            root,
        })
    }

    /// The stack root
    pub fn root(&self) -> &DirNode {
        &self.root
    }

    /// Resolve a directory path from the stack root
    pub fn dir_at<S: AsRef<str>>(&self, path: &[S]) -> Option<&DirNode> {
        self.root.dir_at(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::record::Protocol;
    use pretty_assertions::assert_eq;

    fn record_line(name: &str) -> String {
        format!("{name}= #109#0%192.168.1.10%22%root%%-1%-1%%%%%0%0%0%%%-1%0%0%0%%1080%#MobaFont%10%0")
    }

    const FIXTURE_HEADER: &str = "[Bookmarks]\nSubRep=\nImgNum=42\n";

    #[test]
    fn test_sessions_nest_under_declared_context() {
        let text = format!(
            "{}{}\nSubRep=A\nSubRep=A\\B\n{}\n",
            FIXTURE_HEADER,
            record_line("s1"),
            record_line("s2"),
        );
        let stack = SessionStack::parse("lab", &text).unwrap();

        assert!(stack.root().session("s1").is_some());
        assert!(stack.root().session("s2").is_none());

        let b = stack.dir_at(&["A", "B"]).unwrap();
        assert!(b.session("s2").is_some());
    }

    #[test]
    fn test_child_marker_creates_implicit_parent() {
        let text = format!("SubRep=A\\B\n{}\nSubRep=A\n{}\n", record_line("deep"), record_line("shallow"));
        let stack = SessionStack::parse("lab", &text).unwrap();

        let a = stack.dir_at(&["A"]).unwrap();
        assert!(a.session("shallow").is_some());
        assert!(a.child_dir("B").unwrap().session("deep").is_some());
        // The late bare `A` marker reuses the implicitly created node
        assert_eq!(
            stack
                .root()
                .children
                .iter()
                .filter(|c| matches!(c, Node::Directory(d) if d.name == "A"))
                .count(),
            1
        );
    }

    #[test]
    fn test_duplicate_session_record_replaces() {
        let old = record_line("db01");
        let new = old.replace("192.168.1.10", "192.168.1.99");
        let text = format!("SubRep=\n{old}\n{new}\n");
        let stack = SessionStack::parse("lab", &text).unwrap();

        let session = stack.root().session("db01").unwrap();
        assert_eq!(session.host, "192.168.1.99");
        assert_eq!(stack.root().children.len(), 1);
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let text = format!(
            "SubRep=\n{}\nSubRep=Zeta\nSubRep=\n{}\nSubRep=Alpha\n",
            record_line("first"),
            record_line("second"),
        );
        let stack = SessionStack::parse("lab", &text).unwrap();

        let names: Vec<&str> = stack
            .root()
            .children
            .iter()
            .map(|c| match c {
                Node::Directory(d) => d.name.as_str(),
                Node::Session(s) => s.name.as_str(),
            })
            .collect();
        assert_eq!(names, vec!["first", "Zeta", "second", "Alpha"]);
    }

    #[test]
    fn test_same_name_session_in_different_directories() {
        let text = format!(
            "SubRep=\n{}\nSubRep=A\\B\n{}\n",
            record_line("db01"),
            record_line("db01").replace("192.168.1.10", "10.9.9.9"),
        );
        let stack = SessionStack::parse("lab", &text).unwrap();

        assert_eq!(stack.root().session("db01").unwrap().host, "192.168.1.10");
        assert_eq!(
            stack.dir_at(&["A", "B"]).unwrap().session("db01").unwrap().host,
            "10.9.9.9"
        );
    }

    #[test]
    fn test_malformed_record_aborts_parse() {
        let text = "SubRep=\nbroken= #109#0%host%22%user\n";
        let err = SessionStack::parse("lab", text).unwrap_err();
        assert!(matches!(err, StackError::MalformedRecord(_)));
    }

    #[test]
    fn test_parsed_protocol() {
        let stack = SessionStack::parse("lab", &format!("SubRep=\n{}\n", record_line("s"))).unwrap();
        assert_eq!(stack.root().session("s").unwrap().protocol, Protocol::Ssh);
    }
}
