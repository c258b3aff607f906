// src/tree/derive.rs

use super::{Node, NodeId, NodeKind, ROOT};

/// 从 `id` 沿父节点走到根，包含节点自身。步数受节点总数限制，不会死循环。
pub fn ancestor_chain(nodes: &[Node], id: NodeId, include_root: bool) -> Vec<NodeId> {
    let mut chain = Vec::new();
    let mut current = Some(id);
    let mut steps = 0;
    while let Some(node_id) = current {
        let Some(node) = nodes.get(node_id) else { break };
        if steps > nodes.len() {
            break;
        }
        steps += 1;
        if node_id == ROOT {
            if include_root {
                chain.push(ROOT);
            }
            break;
        }
        chain.push(node_id);
        current = node.parent;
    }
    chain
}

pub(super) fn reaches_root(nodes: &[Node], id: NodeId) -> bool {
    ancestor_chain(nodes, id, true).last() == Some(&ROOT)
}

/// 链上任意节点 (含自身) 被隐藏，即视为隐藏
pub fn is_hidden(nodes: &[Node], id: NodeId) -> bool {
    ancestor_chain(nodes, id, false)
        .into_iter()
        .filter_map(|n| nodes[n].visibility())
        .any(|v| v.is_hidden())
}

/// 最近一个带 position 的节点的位置，没有则为 0
pub fn order(nodes: &[Node], id: NodeId) -> i64 {
    ancestor_chain(nodes, id, false)
        .into_iter()
        .find_map(|n| nodes[n].position())
        .unwrap_or(0)
}

/// 祖先标题 (不含自身与根)，由根向下排列
pub fn path_titles(nodes: &[Node], id: NodeId) -> Vec<String> {
    let mut titles: Vec<String> = ancestor_chain(nodes, id, false)
        .into_iter()
        .skip(1)
        .filter_map(|n| nodes[n].title.clone())
        .collect();
    titles.reverse();
    titles
}

/// 结构性祖先的标题，由根向下排列，用于拼接保存目录
pub fn resource_titles(nodes: &[Node], id: NodeId) -> Vec<String> {
    let mut titles: Vec<String> = ancestor_chain(nodes, id, false)
        .into_iter()
        .skip(1)
        .filter(|n| nodes[*n].is_structural())
        .map(|n| nodes[n].title.clone().unwrap_or_else(|| format!("item-{}", n)))
        .collect();
    titles.reverse();
    titles
}

/// 最近的容器祖先，即发现该内容的来源页面
pub fn source_container(nodes: &[Node], id: NodeId) -> Option<NodeId> {
    ancestor_chain(nodes, id, false)
        .into_iter()
        .skip(1)
        .find(|n| matches!(nodes[*n].kind, NodeKind::Container(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        extractor::classifier::ContentKind,
        tree::{ContainerKind, ContainerNode, ContentNode, Hosting, Tree, Visibility},
    };

    fn container(kind: ContainerKind, position: Option<i64>, visibility: Visibility) -> NodeKind {
        NodeKind::Container(ContainerNode {
            kind,
            native_id: None,
            html_url: None,
            position,
            visibility,
        })
    }

    fn content(kind: ContentKind) -> NodeKind {
        NodeKind::Content(ContentNode::new(kind, Some("https://x/f".into()), Hosting::External))
    }

    #[test]
    fn test_announcement_under_unpublished_module_is_hidden() {
        let tree = Tree::new(Some("Course".into()));
        let hidden_module = Visibility { published: false, ..Default::default() };
        let module = tree
            .attach(ROOT, None, Some("Week 1".into()), container(ContainerKind::Module, Some(1), hidden_module))
            .unwrap();
        let announcement = tree
            .attach(module, None, Some("Welcome".into()), container(ContainerKind::Announcement, None, Visibility::default()))
            .unwrap();
        let file = tree.attach(announcement, None, Some("a.pdf".into()), content(ContentKind::Document)).unwrap();

        assert!(tree.is_hidden(announcement));
        assert!(tree.is_hidden(file));
        assert!(!tree.is_hidden(ROOT));
    }

    #[test]
    fn test_hiding_an_ancestor_only_adds_hidden_nodes() {
        let build = |hide_top: bool| {
            let tree = Tree::new(None);
            let top_vis = Visibility { locked: hide_top, ..Default::default() };
            let top = tree.attach(ROOT, None, None, container(ContainerKind::Module, None, top_vis)).unwrap();
            let mid_vis = Visibility { hide_from_students: true, ..Default::default() };
            let mid = tree.attach(top, None, None, container(ContainerKind::Page, None, mid_vis)).unwrap();
            let leaf = tree.attach(mid, None, None, content(ContentKind::Document)).unwrap();
            let sibling = tree.attach(top, None, None, content(ContentKind::ImageFile)).unwrap();
            [top, mid, leaf, sibling].map(|n| tree.is_hidden(n))
        };
        let before = build(false);
        let after = build(true);
        for (b, a) in before.iter().zip(after.iter()) {
            assert!(!b || *a);
        }
        assert_eq!(after, [true; 4]);
    }

    #[test]
    fn test_chain_and_order() {
        let tree = Tree::new(None);
        let module = tree
            .attach(ROOT, None, Some("M".into()), container(ContainerKind::Module, Some(3), Visibility::default()))
            .unwrap();
        let page = tree
            .attach(module, None, Some("P".into()), container(ContainerKind::Page, None, Visibility::default()))
            .unwrap();
        let doc = tree.attach(page, None, Some("d.pdf".into()), content(ContentKind::Document)).unwrap();

        let nodes = tree.read();
        assert_eq!(ancestor_chain(&nodes, doc, false), vec![doc, page, module]);
        assert_eq!(ancestor_chain(&nodes, doc, true), vec![doc, page, module, ROOT]);
        assert_eq!(order(&nodes, doc), 3);
        assert_eq!(order(&nodes, ROOT), 0);
        assert_eq!(path_titles(&nodes, doc), vec!["M".to_string(), "P".to_string()]);
        assert_eq!(resource_titles(&nodes, doc), vec!["M".to_string(), "P".to_string()]);
        assert_eq!(source_container(&nodes, doc), Some(page));
    }

    #[test]
    fn test_storage_site_is_structural() {
        let tree = Tree::new(None);
        let site = tree.attach(ROOT, None, Some("Shared".into()), content(ContentKind::FileStorageSite)).unwrap();
        let item = tree.attach(site, None, Some("notes.pdf".into()), content(ContentKind::Document)).unwrap();
        let nodes = tree.read();
        assert_eq!(resource_titles(&nodes, item), vec!["Shared".to_string()]);
        assert_eq!(source_container(&nodes, item), None);
    }
}
