//! Multi-stack resolution
//!
//! The resolver owns the parsed trees of every imported stack, in registry
//! order, and answers the three query modes: substring search, outline
//! listing, and exact connect resolution. Stacks are re-read and re-parsed
//! for every command; nothing is cached across invocations.

use tracing::debug;

use crate::error::{Result, StackError};
use crate::registry::Registry;
use crate::stack::address::Address;
use crate::stack::read_latin1;
use crate::stack::record::{Protocol, SessionRecord};
use crate::stack::tree::{DirNode, Node, SessionStack};

/// Object filter for search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Session,
    Directory,
    Any,
}

impl SearchKind {
    fn wants_sessions(self) -> bool {
        matches!(self, Self::Session | Self::Any)
    }

    fn wants_directories(self) -> bool {
        matches!(self, Self::Directory | Self::Any)
    }
}

/// One search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Full address of the matched node; directories carry a trailing slash
    pub address: String,
    /// Protocol of a session hit, `None` for directory hits
    pub protocol: Option<Protocol>,
}

impl SearchHit {
    /// Output line for this hit
    pub fn render(&self) -> String {
        match self.protocol {
            Some(protocol) => format!("{}  {}", self.address, protocol.tag()),
            None => self.address.clone(),
        }
    }
}

/// A session located by connect resolution
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    /// Stack the session was found in
    pub stack: String,
    /// Directory chain from the stack root
    pub directory: Vec<String>,
    /// The session record itself
    pub record: SessionRecord,
}

impl ResolvedSession {
    /// Full address of the resolved session
    pub fn address(&self) -> String {
        session_address(&self.stack, &self.directory, &self.record.name)
    }
}

/// Parsed stacks of every registry entry, in registry order
#[derive(Debug)]
pub struct Resolver {
    stacks: Vec<SessionStack>,
}

impl Resolver {
    pub fn new(stacks: Vec<SessionStack>) -> Self {
        Self { stacks }
    }

    /// Read and parse every registered stack file.
    ///
    /// An empty registry is a hard precondition failure for every query
    /// mode, not an empty result.
    pub fn load(registry: &Registry) -> Result<Self> {
        let entries = registry.require_entries()?;
        let mut stacks = Vec::with_capacity(entries.len());
        for entry in entries {
            debug!("parsing session stack '{}' from {}", entry.name, entry.path.display());
            let text = read_latin1(&entry.path)?;
            stacks.push(SessionStack::parse(entry.name.clone(), &text)?);
        }
        Ok(Self::new(stacks))
    }

    pub fn stacks(&self) -> &[SessionStack] {
        &self.stacks
    }

    /// Case-insensitive substring search over all stacks.
    ///
    /// Hits come back in traversal order per stack, stacks in registry
    /// order. Sessions match on their name, directories on their decoded
    /// slash-joined path.
    pub fn search(&self, kind: SearchKind, pattern: &str) -> Vec<SearchHit> {
        let needle = pattern.to_lowercase();
        let mut hits = Vec::new();
        for stack in &self.stacks {
            let mut path = Vec::new();
            search_dir(&stack.name, stack.root(), &mut path, kind, &needle, &mut hits);
        }
        hits
    }

    /// Render the nested outline of every stack, or of one addressed
    /// directory subtree. Pure function of the parsed trees.
    pub fn render_list(&self, address: Option<&Address>) -> Result<String> {
        let mut out = String::new();
        match address {
            None => {
                for stack in &self.stacks {
                    out.push_str(&format!("[{}]\n", stack.name));
                    render_children(stack.root(), 1, &mut out);
                }
            }
            Some(addr) => {
                let (stack, node) = self.resolve_directory(addr)?;
                out.push_str(&format!("[{}]\n", stack.name));
                if node.name.is_empty() {
                    render_children(node, 1, &mut out);
                } else {
                    out.push_str(&format!("  [{}]\n", node.name));
                    render_children(node, 2, &mut out);
                }
            }
        }
        Ok(out)
    }

    /// Resolve an address to exactly one session leaf.
    ///
    /// The session must live at the addressed directory context; an
    /// identically named session elsewhere in the tree never matches.
    /// Relative addresses scan stacks in registry order and the first stack
    /// containing both the directory chain and the session wins.
    pub fn resolve_session(&self, address: &Address) -> Result<ResolvedSession> {
        if address.is_directory() {
            return Err(StackError::MalformedAddress(address.to_string()).into());
        }
        let (dirs, leaf) = address
            .split_leaf()
            .ok_or_else(|| StackError::MalformedAddress(address.to_string()))?;

        if let Some(stack_name) = address.stack() {
            let stack = self.stack_named(stack_name)?;
            let dir = stack
                .dir_at(dirs)
                .ok_or_else(|| StackError::DirectoryNotFound(address.to_string()))?;
            let record = dir
                .session(leaf)
                .ok_or_else(|| StackError::SessionNotFound(address.to_string()))?;
            return Ok(ResolvedSession {
                stack: stack.name.clone(),
                directory: dirs.to_vec(),
                record: record.clone(),
            });
        }

        for stack in &self.stacks {
            if let Some(record) = stack.dir_at(dirs).and_then(|dir| dir.session(leaf)) {
                return Ok(ResolvedSession {
                    stack: stack.name.clone(),
                    directory: dirs.to_vec(),
                    record: record.clone(),
                });
            }
        }
        Err(StackError::SessionNotFound(address.to_string()).into())
    }

    /// Resolve an address to a directory node (for `list <address>`)
    fn resolve_directory(&self, address: &Address) -> Result<(&SessionStack, &DirNode)> {
        if let Some(stack_name) = address.stack() {
            let stack = self.stack_named(stack_name)?;
            let node = stack
                .dir_at(address.path())
                .ok_or_else(|| StackError::DirectoryNotFound(address.to_string()))?;
            return Ok((stack, node));
        }

        for stack in &self.stacks {
            if let Some(node) = stack.dir_at(address.path()) {
                return Ok((stack, node));
            }
        }
        Err(StackError::DirectoryNotFound(address.to_string()).into())
    }

    fn stack_named(&self, name: &str) -> Result<&SessionStack> {
        self.stacks
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| StackError::StackNotFound(name.to_string()).into())
    }
}

fn session_address(stack: &str, dirs: &[String], name: &str) -> String {
    if dirs.is_empty() {
        format!("/{stack}/{name}")
    } else {
        format!("/{stack}/{}/{name}", dirs.join("/"))
    }
}

fn directory_address(stack: &str, dirs: &[String]) -> String {
    format!("/{stack}/{}/", dirs.join("/"))
}

fn search_dir(
    stack: &str,
    node: &DirNode,
    path: &mut Vec<String>,
    kind: SearchKind,
    needle: &str,
    hits: &mut Vec<SearchHit>,
) {
    for child in &node.children {
        match child {
            Node::Session(record) => {
                if kind.wants_sessions() && record.name.to_lowercase().contains(needle) {
                    hits.push(SearchHit {
                        address: session_address(stack, path, &record.name),
                        protocol: Some(record.protocol),
                    });
                }
            }
            Node::Directory(dir) => {
                path.push(dir.name.clone());
                if kind.wants_directories() && path.join("/").to_lowercase().contains(needle) {
                    hits.push(SearchHit {
                        address: directory_address(stack, path),
                        protocol: None,
                    });
                }
                search_dir(stack, dir, path, kind, needle, hits);
                path.pop();
            }
        }
    }
}

fn render_children(node: &DirNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for child in &node.children {
        match child {
            Node::Directory(dir) => {
                out.push_str(&format!("{indent}[{}]\n", dir.name));
                render_children(dir, depth + 1, out);
            }
            Node::Session(record) => {
                out.push_str(&format!("{indent}- {}  {}\n", record.name, record.protocol.tag()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    fn record_line(name: &str, host: &str) -> String {
        format!("{name}= #109#0%{host}%22%admin%%-1%-1%%%%%0%0%0%%%-1%0%0%0%%1080%#MobaFont%10%0")
    }

    fn lab_stack(name: &str) -> SessionStack {
        let text = format!(
            "[Bookmarks]\nSubRep=\n{}\nSubRep=A\nSubRep=A\\B\n{}\n",
            record_line("s1", "10.0.0.1"),
            record_line("s2", "10.0.0.2"),
        );
        SessionStack::parse(name, &text).unwrap()
    }

    fn resolver() -> Resolver {
        Resolver::new(vec![lab_stack("lab")])
    }

    #[test]
    fn test_search_directory_single_hit() {
        let hits = resolver().search(SearchKind::Directory, "B");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].address, "/lab/A/B/");
        assert_eq!(hits[0].protocol, None);
    }

    #[test]
    fn test_search_sessions_case_insensitive() {
        let hits = resolver().search(SearchKind::Session, "S2");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].address, "/lab/A/B/s2");
        assert_eq!(hits[0].protocol, Some(Protocol::Ssh));
        assert_eq!(hits[0].render(), "/lab/A/B/s2  [+] SSH");
    }

    #[test]
    fn test_search_any_spans_both_kinds() {
        let resolver = Resolver::new(vec![SessionStack::parse(
            "lab",
            &format!("SubRep=web\n{}\n", record_line("webserver", "10.0.0.3")),
        )
        .unwrap()]);

        let hits = resolver.search(SearchKind::Any, "web");
        let addresses: Vec<&str> = hits.iter().map(|h| h.address.as_str()).collect();
        assert_eq!(addresses, vec!["/lab/web/", "/lab/web/webserver"]);
    }

    #[test]
    fn test_search_order_follows_registry_order() {
        let resolver = Resolver::new(vec![lab_stack("one"), lab_stack("two")]);
        let hits = resolver.search(SearchKind::Session, "s");
        let addresses: Vec<&str> = hits.iter().map(|h| h.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec!["/one/s1", "/one/A/B/s2", "/two/s1", "/two/A/B/s2"]
        );
    }

    #[test]
    fn test_list_outline() {
        let out = resolver().render_list(None).unwrap();
        let expected = "\
[lab]
  - s1  [+] SSH
  [A]
    [B]
      - s2  [+] SSH
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_list_is_idempotent() {
        let resolver = resolver();
        let first = resolver.render_list(None).unwrap();
        let second = resolver.render_list(None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_list_addressed_subtree() {
        let addr = Address::parse("/lab/A/B/").unwrap();
        let out = resolver().render_list(Some(&addr)).unwrap();
        assert_eq!(out, "[lab]\n  [B]\n    - s2  [+] SSH\n");
    }

    #[test]
    fn test_list_stack_root_address() {
        let addr = Address::parse("/lab").unwrap();
        let out = resolver().render_list(Some(&addr)).unwrap();
        assert_eq!(out, resolver().render_list(None).unwrap());
    }

    #[test]
    fn test_list_unknown_directory() {
        let addr = Address::parse("/lab/Z/").unwrap();
        let err = resolver().render_list(Some(&addr)).unwrap_err();
        assert!(matches!(err, Error::Stack(StackError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_connect_resolution_enters_directory_context() {
        let addr = Address::parse("/lab/A/B/s2").unwrap();
        let resolved = resolver().resolve_session(&addr).unwrap();
        assert_eq!(resolved.stack, "lab");
        assert_eq!(resolved.directory, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(resolved.record.host, "10.0.0.2");
        assert_eq!(resolved.address(), "/lab/A/B/s2");
    }

    #[test]
    fn test_connect_root_session_does_not_shadow_nested_path() {
        // A session named s2 at the root must not satisfy /lab/A/B/s2
        let text = format!(
            "SubRep=\n{}\nSubRep=A\\B\n",
            record_line("s2", "172.16.0.1"),
        );
        let resolver = Resolver::new(vec![SessionStack::parse("lab", &text).unwrap()]);

        let addr = Address::parse("/lab/A/B/s2").unwrap();
        let err = resolver.resolve_session(&addr).unwrap_err();
        assert!(matches!(err, Error::Stack(StackError::SessionNotFound(_))));

        let root_addr = Address::parse("/lab/s2").unwrap();
        assert_eq!(
            resolver.resolve_session(&root_addr).unwrap().record.host,
            "172.16.0.1"
        );
    }

    #[test]
    fn test_connect_unknown_stack() {
        let addr = Address::parse("/nope/s1").unwrap();
        let err = resolver().resolve_session(&addr).unwrap_err();
        assert!(matches!(err, Error::Stack(StackError::StackNotFound(_))));
    }

    #[test]
    fn test_connect_directory_address_is_malformed() {
        let addr = Address::parse("/lab/A/B/").unwrap();
        let err = resolver().resolve_session(&addr).unwrap_err();
        assert!(matches!(err, Error::Stack(StackError::MalformedAddress(_))));
    }

    #[test]
    fn test_relative_address_first_stack_wins() {
        let first = SessionStack::parse(
            "first",
            &format!("SubRep=A\\B\n{}\n", record_line("s2", "10.1.1.1")),
        )
        .unwrap();
        let second = SessionStack::parse(
            "second",
            &format!("SubRep=A\\B\n{}\n", record_line("s2", "10.2.2.2")),
        )
        .unwrap();
        let resolver = Resolver::new(vec![first, second]);

        let addr = Address::parse("A/B/s2").unwrap();
        let resolved = resolver.resolve_session(&addr).unwrap();
        assert_eq!(resolved.stack, "first");
        assert_eq!(resolved.record.host, "10.1.1.1");
    }

    #[test]
    fn test_relative_address_skips_stacks_without_full_match() {
        // The directory exists in the first stack but the session only in
        // the second; the first stack must not short-circuit resolution.
        let first = SessionStack::parse("first", "SubRep=A\\B\n").unwrap();
        let second = SessionStack::parse(
            "second",
            &format!("SubRep=A\\B\n{}\n", record_line("s2", "10.2.2.2")),
        )
        .unwrap();
        let resolver = Resolver::new(vec![first, second]);

        let addr = Address::parse("A/B/s2").unwrap();
        let resolved = resolver.resolve_session(&addr).unwrap();
        assert_eq!(resolved.stack, "second");
    }
}
