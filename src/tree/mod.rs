// src/tree/mod.rs

//! 课程结构树。节点存放在一个数组 (arena) 中，通过下标互相引用，
//! 父子关系只保存句柄，不存在引用环。

pub mod derive;
pub mod manifest;

pub use manifest::{Manifest, Registration};

use crate::{extractor::classifier::ContentKind, models::api::Extra, utils};
use log::warn;
use serde::Serialize;
use std::sync::{RwLock, RwLockReadGuard};

pub type NodeId = usize;
pub const ROOT: NodeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Module,
    Page,
    Assignment,
    Discussion,
    Quiz,
    Announcement,
    Folder,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Module => "module",
            ContainerKind::Page => "page",
            ContainerKind::Assignment => "assignment",
            ContainerKind::Discussion => "discussion",
            ContainerKind::Quiz => "quiz",
            ContainerKind::Announcement => "announcement",
            ContainerKind::Folder => "folder",
        }
    }
}

/// 可见性标记。任意一项命中即视为隐藏。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub hidden_for_user: bool,
    pub published: bool,
    pub hide_from_students: bool,
    pub locked: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            hidden_for_user: false,
            published: true,
            hide_from_students: false,
            locked: false,
        }
    }
}

impl Visibility {
    pub fn is_hidden(&self) -> bool {
        self.hidden_for_user || !self.published || self.hide_from_students || self.locked
    }
}

/// 内容由谁托管
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hosting {
    Lms,
    MediaService,
    External,
}

#[derive(Debug, Clone)]
pub struct ContainerNode {
    pub kind: ContainerKind,
    pub native_id: Option<String>,
    pub html_url: Option<String>,
    pub position: Option<i64>,
    pub visibility: Visibility,
}

#[derive(Debug, Clone)]
pub struct ContentNode {
    pub kind: ContentKind,
    pub url: Option<String>,
    pub download_url: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub captioned: bool,
    pub hosting: Hosting,
    pub visibility: Visibility,
    pub source: Extra,
}

impl ContentNode {
    pub fn new(kind: ContentKind, url: Option<String>, hosting: Hosting) -> Self {
        Self {
            kind,
            url,
            download_url: None,
            file_name: None,
            mime_type: None,
            captioned: false,
            hosting,
            visibility: Visibility::default(),
            source: Extra::new(),
        }
    }

    /// 实际用于下载的地址
    pub fn fetch_url(&self) -> Option<&str> {
        self.download_url.as_deref().or(self.url.as_deref())
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Root,
    Container(ContainerNode),
    Content(ContentNode),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub item_id: Option<String>,
    pub title: Option<String>,
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn is_content(&self) -> bool {
        matches!(self.kind, NodeKind::Content(_))
    }

    pub fn as_content(&self) -> Option<&ContentNode> {
        match &self.kind {
            NodeKind::Content(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&ContainerNode> {
        match &self.kind {
            NodeKind::Container(c) => Some(c),
            _ => None,
        }
    }

    /// 结构性节点的标题会出现在保存路径中
    pub fn is_structural(&self) -> bool {
        match &self.kind {
            NodeKind::Root => false,
            NodeKind::Container(_) => true,
            NodeKind::Content(c) => c.kind == ContentKind::FileStorageSite,
        }
    }

    pub fn visibility(&self) -> Option<&Visibility> {
        match &self.kind {
            NodeKind::Root => None,
            NodeKind::Container(c) => Some(&c.visibility),
            NodeKind::Content(c) => Some(&c.visibility),
        }
    }

    pub fn position(&self) -> Option<i64> {
        self.as_container().and_then(|c| c.position)
    }
}

/// 按优先级推导资源标识: 原生 id → md5(url+title) → md5(url) → md5(title)
pub fn derive_item_id(native_id: Option<&str>, url: Option<&str>, title: Option<&str>) -> Option<String> {
    fn non_empty(s: Option<&str>) -> Option<&str> {
        s.map(str::trim).filter(|s| !s.is_empty())
    }
    if let Some(id) = non_empty(native_id) {
        return Some(id.to_string());
    }
    match (non_empty(url), non_empty(title)) {
        (Some(u), Some(t)) => Some(utils::md5_hex(&format!("{}{}", u, t))),
        (Some(u), None) => Some(utils::md5_hex(u)),
        (None, Some(t)) => Some(utils::md5_hex(t)),
        (None, None) => None,
    }
}

pub struct Tree {
    nodes: RwLock<Vec<Node>>,
}

impl Tree {
    pub fn new(root_title: Option<String>) -> Self {
        let root = Node {
            id: ROOT,
            parent: None,
            item_id: None,
            title: root_title,
            kind: NodeKind::Root,
            children: Vec::new(),
        };
        Self { nodes: RwLock::new(vec![root]) }
    }

    /// 把新节点挂到 `parent` 下。父节点不存在或无法回溯到根节点时拒绝挂载。
    pub fn attach(
        &self,
        parent: NodeId,
        item_id: Option<String>,
        title: Option<String>,
        kind: NodeKind,
    ) -> Option<NodeId> {
        let mut nodes = self.nodes.write().unwrap();
        if !derive::reaches_root(&nodes, parent) {
            warn!(
                "父节点 {} 无法回溯到根节点，拒绝挂载 '{}'",
                parent,
                title.as_deref().unwrap_or("(无标题)")
            );
            return None;
        }
        let id = nodes.len();
        nodes.push(Node {
            id,
            parent: Some(parent),
            item_id,
            title,
            kind,
            children: Vec::new(),
        });
        nodes[parent].children.push(id);
        Some(id)
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<Node>> {
        self.nodes.read().unwrap()
    }

    pub fn get(&self, id: NodeId) -> Option<Node> {
        self.read().get(id).cloned()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.read().get(id).map(|n| n.children.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    pub fn ancestor_chain(&self, id: NodeId, include_root: bool) -> Vec<NodeId> {
        derive::ancestor_chain(&self.read(), id, include_root)
    }

    pub fn is_hidden(&self, id: NodeId) -> bool {
        derive::is_hidden(&self.read(), id)
    }

    pub fn order(&self, id: NodeId) -> i64 {
        derive::order(&self.read(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(kind: ContainerKind) -> NodeKind {
        NodeKind::Container(ContainerNode {
            kind,
            native_id: None,
            html_url: None,
            position: None,
            visibility: Visibility::default(),
        })
    }

    #[test]
    fn test_attach_preserves_discovery_order() {
        let tree = Tree::new(Some("Course".into()));
        let a = tree.attach(ROOT, None, Some("A".into()), container(ContainerKind::Page)).unwrap();
        let b = tree.attach(ROOT, None, Some("B".into()), container(ContainerKind::Page)).unwrap();
        let c = tree.attach(a, None, Some("C".into()), container(ContainerKind::Folder)).unwrap();

        assert_eq!(tree.children(ROOT), vec![a, b]);
        assert_eq!(tree.children(a), vec![c]);
        assert_eq!(tree.get(c).and_then(|n| n.parent), Some(a));
    }

    #[test]
    fn test_attach_refuses_unknown_parent() {
        let tree = Tree::new(None);
        assert!(tree.attach(42, None, Some("orphan".into()), container(ContainerKind::Page)).is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_derive_item_id_priority() {
        assert_eq!(derive_item_id(Some("42"), Some("u"), Some("t")).as_deref(), Some("42"));
        assert_eq!(
            derive_item_id(None, Some("https://x/a.pdf"), Some("A")),
            Some(utils::md5_hex("https://x/a.pdfA"))
        );
        assert_eq!(derive_item_id(Some(" "), Some("u"), None), Some(utils::md5_hex("u")));
        assert_eq!(derive_item_id(None, None, Some("t")), Some(utils::md5_hex("t")));
        assert_eq!(derive_item_id(None, Some(""), None), None);
    }

    #[test]
    fn test_visibility_flags() {
        assert!(!Visibility::default().is_hidden());
        assert!(Visibility { published: false, ..Default::default() }.is_hidden());
        assert!(Visibility { locked: true, ..Default::default() }.is_hidden());
        assert!(Visibility { hide_from_students: true, ..Default::default() }.is_hidden());
        assert!(Visibility { hidden_for_user: true, ..Default::default() }.is_hidden());
    }
}
