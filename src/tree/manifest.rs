// src/tree/manifest.rs

use super::NodeId;
use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy)]
struct ManifestEntry {
    node: NodeId,
    seq: u64,
    is_content: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// 新登记的节点
    New(NodeId),
    /// 该标识已存在，返回其规范节点
    Existing(NodeId),
    /// 节点未能创建 (例如父节点无效)
    Rejected,
}

/// 资源标识 → 首个登记节点。重复登记不会覆盖，只计数。
#[derive(Default)]
pub struct Manifest {
    entries: DashMap<String, ManifestEntry>,
    next_seq: AtomicU64,
    duplicates: AtomicUsize,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记已存在的节点，返回是否为首次登记
    pub fn register(&self, item_id: &str, node: NodeId, is_content: bool) -> bool {
        matches!(
            self.register_with(item_id, is_content, || Some(node)),
            Registration::New(_)
        )
    }

    /// 检查与插入在同一个分片锁内完成；只有首次出现的标识才会调用 `create`。
    pub fn register_with<F>(&self, item_id: &str, is_content: bool, create: F) -> Registration
    where
        F: FnOnce() -> Option<NodeId>,
    {
        match self.entries.entry(item_id.to_string()) {
            Entry::Occupied(existing) => {
                self.duplicates.fetch_add(1, Ordering::Relaxed);
                Registration::Existing(existing.get().node)
            }
            Entry::Vacant(slot) => match create() {
                Some(node) => {
                    let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                    slot.insert(ManifestEntry { node, seq, is_content });
                    Registration::New(node)
                }
                None => Registration::Rejected,
            },
        }
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.entries.contains_key(item_id)
    }

    pub fn canonical(&self, item_id: &str) -> Option<NodeId> {
        self.entries.get(item_id).map(|e| e.node)
    }

    /// 所有内容节点，按登记顺序排列
    pub fn content_view(&self) -> Vec<(String, NodeId)> {
        let mut view: Vec<(u64, String, NodeId)> = self
            .entries
            .iter()
            .filter(|e| e.value().is_content)
            .map(|e| (e.value().seq, e.key().clone(), e.value().node))
            .collect();
        view.sort_by_key(|(seq, _, _)| *seq);
        view.into_iter().map(|(_, id, node)| (id, node)).collect()
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicates.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
